//! HTTP handlers for sales order and dispatch endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::production::StatusFilter;
use crate::middleware::{require_role, CurrentUser};
use crate::services::orders::{
    CreateOrderInput, DispatchInput, OrderDetail, OrderRecord, OrderService,
};
use crate::AppState;
use shared::Role;

/// List sales orders
pub async fn list_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<OrderRecord>>> {
    let service = OrderService::new(state.db);
    let orders = service.list_orders(filter.status).await?;
    Ok(Json(orders))
}

/// Get one order with its lines
pub async fn get_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service.get_order(order_id).await?;
    Ok(Json(order))
}

/// Place a sales order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = OrderService::new(state.db);
    let order = service.create_order(&current_user.0, input).await?;
    Ok(Json(order))
}

/// Re-run the allocation waterfall for a product
pub async fn reallocate(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = OrderService::new(state.db);
    service.reallocate(&current_user.0, product_id).await?;
    Ok(Json(()))
}

/// Dispatch allocated pieces against an order
pub async fn dispatch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<DispatchInput>,
) -> AppResult<Json<OrderDetail>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Store],
    )?;
    let service = OrderService::new(state.db);
    let order = service.dispatch(&current_user.0, order_id, input).await?;
    Ok(Json(order))
}
