//! HTTP handlers for vendor master endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::vendor::{CreateVendorInput, VendorRecord, VendorService};
use crate::AppState;
use shared::{Role, VendorCategory};

#[derive(Debug, Deserialize)]
pub struct CategoryFilter {
    pub category: Option<VendorCategory>,
}

/// Register a vendor
pub async fn create_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateVendorInput>,
) -> AppResult<Json<VendorRecord>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = VendorService::new(state.db);
    let vendor = service.create_vendor(input).await?;
    Ok(Json(vendor))
}

/// List active vendors
pub async fn list_vendors(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<CategoryFilter>,
) -> AppResult<Json<Vec<VendorRecord>>> {
    let service = VendorService::new(state.db);
    let vendors = service.list_vendors(filter.category).await?;
    Ok(Json(vendors))
}

/// Get one vendor with its payable balance
pub async fn get_vendor(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(vendor_id): Path<Uuid>,
) -> AppResult<Json<VendorRecord>> {
    let service = VendorService::new(state.db);
    let vendor = service.get_vendor(vendor_id).await?;
    Ok(Json(vendor))
}
