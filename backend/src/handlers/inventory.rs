//! HTTP handlers for material and product inventory endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::inventory::{
    BomLineRecord, CreateMaterialInput, CreateProductInput, InventoryService, MaterialStockView,
    ProductRecord, ProductStockView, ReceiveFinishedInput, ReceiveLotInput, UpdateMaterialInput,
};
use crate::AppState;
use shared::Role;

/// Register a raw material
pub async fn create_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMaterialInput>,
) -> AppResult<Json<MaterialStockView>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = InventoryService::new(state.db);
    let material = service.create_material(input).await?;
    let view = service.get_material(material.id).await?;
    Ok(Json(view))
}

/// List materials with computed stock health
pub async fn list_materials(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<MaterialStockView>>> {
    let service = InventoryService::new(state.db);
    let materials = service.list_materials().await?;
    Ok(Json(materials))
}

/// Get one material with its lots
pub async fn get_material(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<MaterialStockView>> {
    let service = InventoryService::new(state.db);
    let material = service.get_material(material_id).await?;
    Ok(Json(material))
}

/// Update a material's planning metrics
pub async fn update_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
    Json(input): Json<UpdateMaterialInput>,
) -> AppResult<Json<MaterialStockView>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = InventoryService::new(state.db);
    let material = service.update_material(material_id, input).await?;
    Ok(Json(material))
}

/// Receive a lot of material into stock
pub async fn receive_material_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
    Json(input): Json<ReceiveLotInput>,
) -> AppResult<Json<MaterialStockView>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Store],
    )?;
    let service = InventoryService::new(state.db);
    let material = service.receive_material_lot(material_id, input).await?;
    Ok(Json(material))
}

/// Register a product with its bill of materials
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<ProductRecord>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = InventoryService::new(state.db);
    let product = service.create_product(input).await?;
    Ok(Json(product))
}

/// List products with computed stock health
pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductStockView>>> {
    let service = InventoryService::new(state.db);
    let products = service.list_products().await?;
    Ok(Json(products))
}

/// Get one product with its finished and semi-finished lots
pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductStockView>> {
    let service = InventoryService::new(state.db);
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Book finished goods directly into the warehouse
pub async fn receive_finished_lot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ReceiveFinishedInput>,
) -> AppResult<Json<ProductStockView>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Store],
    )?;
    let service = InventoryService::new(state.db);
    let product = service
        .receive_finished_lot(product_id, input, &current_user.0.name)
        .await?;
    Ok(Json(product))
}

/// Get a product's bill of materials
pub async fn get_bom(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<BomLineRecord>>> {
    let service = InventoryService::new(state.db);
    let bom = service.get_bom(product_id).await?;
    Ok(Json(bom))
}
