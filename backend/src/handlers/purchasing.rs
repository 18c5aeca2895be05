//! HTTP handlers for purchasing endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::production::StatusFilter;
use crate::middleware::{require_role, CurrentUser};
use crate::services::purchasing::{
    CreatePoInput, PoDetail, PoRecord, PurchasingService, ReceiptReviewInput, ReceiveInput,
    SurplusReportLine,
};
use crate::AppState;
use shared::Role;

/// Raise a purchase order
pub async fn create_po(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePoInput>,
) -> AppResult<Json<PoDetail>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = PurchasingService::new(state.db, state.config.hold_threshold());
    let po = service.create_po(&current_user.0, input).await?;
    Ok(Json(po))
}

/// List purchase orders
pub async fn list_pos(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<PoRecord>>> {
    let service = PurchasingService::new(state.db, state.config.hold_threshold());
    let pos = service.list_pos(filter.status).await?;
    Ok(Json(pos))
}

/// Get one purchase order with its receipts
pub async fn get_po(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PoDetail>> {
    let service = PurchasingService::new(state.db, state.config.hold_threshold());
    let po = service.get_po(po_id).await?;
    Ok(Json(po))
}

/// Book a receipt against a purchase order
pub async fn receive(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
    Json(input): Json<ReceiveInput>,
) -> AppResult<Json<PoDetail>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Store],
    )?;
    let service = PurchasingService::new(state.db, state.config.hold_threshold());
    let po = service.receive(&current_user.0, po_id, input).await?;
    Ok(Json(po))
}

/// Admin decision on a held receipt
pub async fn review_receipt(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(po_id): Path<Uuid>,
    Json(input): Json<ReceiptReviewInput>,
) -> AppResult<Json<PoDetail>> {
    require_role(&current_user.0, &[Role::Admin])?;
    let service = PurchasingService::new(state.db, state.config.hold_threshold());
    let po = service.review_receipt(&current_user.0, po_id, input).await?;
    Ok(Json(po))
}

/// Surplus ledger report with live remaining quantities
pub async fn surplus_report(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<SurplusReportLine>>> {
    let service = PurchasingService::new(state.db, state.config.hold_threshold());
    let report = service.surplus_report().await?;
    Ok(Json(report))
}
