//! Route definitions for the Production Fulfillment Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - material inventory
        .nest("/materials", material_routes())
        // Protected routes - product catalog and finished stock
        .nest("/products", product_routes())
        // Protected routes - production planning
        .nest("/plans", plan_routes())
        // Protected routes - job cards
        .nest("/jobs", job_routes())
        // Protected routes - quality gates
        .nest("/quality", quality_routes())
        // Protected routes - sales orders and dispatch
        .nest("/orders", order_routes())
        // Protected routes - purchasing
        .nest("/purchase-orders", purchasing_routes())
        // Protected routes - vendor master
        .nest("/vendors", vendor_routes())
}

/// Material inventory routes (protected)
fn material_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_materials).post(handlers::create_material),
        )
        .route(
            "/:material_id",
            get(handlers::get_material).put(handlers::update_material),
        )
        .route("/:material_id/lots", post(handlers::receive_material_lot))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/:product_id", get(handlers::get_product))
        .route("/:product_id/bom", get(handlers::get_bom))
        .route("/:product_id/lots", post(handlers::receive_finished_lot))
        .route("/:product_id/reallocate", post(handlers::reallocate))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Production planning routes (protected)
fn plan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_plans).post(handlers::create_manual_plan),
        )
        .route(
            "/:plan_id",
            get(handlers::get_plan).delete(handlers::delete_plan),
        )
        .route("/:plan_id/confirm", post(handlers::confirm_strategy))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Job card routes (protected)
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_jobs))
        .route("/:job_id", get(handlers::get_job))
        .route("/:job_id/issue-materials", post(handlers::issue_materials))
        .route("/:job_id/stage", post(handlers::update_stage))
        .route("/:job_id/override", post(handlers::override_stage))
        .route("/:job_id/dispatch", post(handlers::dispatch_to_vendor))
        .route("/:job_id/receive", post(handlers::receive_parcel))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Quality gate routes (protected)
fn quality_routes() -> Router<AppState> {
    Router::new()
        .route("/pending", get(handlers::list_pending))
        .route("/held", get(handlers::list_held))
        .route("/:job_id/submit", post(handlers::submit_qc))
        .route("/:job_id/review", post(handlers::review_hold))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Sales order routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/dispatch", post(handlers::dispatch))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Purchasing routes (protected)
fn purchasing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_pos).post(handlers::create_po))
        .route("/surplus", get(handlers::surplus_report))
        .route("/:po_id", get(handlers::get_po))
        .route("/:po_id/receive", post(handlers::receive))
        .route("/:po_id/review", post(handlers::review_receipt))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Vendor master routes (protected)
fn vendor_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_vendors).post(handlers::create_vendor),
        )
        .route("/:vendor_id", get(handlers::get_vendor))
        .route_layer(middleware::from_fn(auth_middleware))
}
