//! HTTP handlers for production planning endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::production::{
    ConfirmStrategyInput, CreateManualPlanInput, PlanView, ProductionService,
};
use crate::AppState;
use shared::Role;

/// Optional status filter on list endpoints
#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

/// List production plans with their live allocation ceilings
pub async fn list_plans(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<PlanView>>> {
    let service = ProductionService::new(state.db);
    let plans = service.list_plans(filter.status).await?;
    Ok(Json(plans))
}

/// Get one production plan
pub async fn get_plan(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<PlanView>> {
    let service = ProductionService::new(state.db);
    let plan = service.get_plan(plan_id).await?;
    Ok(Json(plan))
}

/// Create a manual stock-build plan
pub async fn create_manual_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateManualPlanInput>,
) -> AppResult<Json<PlanView>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = ProductionService::new(state.db);
    let plan = service.create_manual_plan(&current_user.0, input).await?;
    Ok(Json(plan))
}

/// Confirm a sourcing strategy, spawning a job card per split
pub async fn confirm_strategy(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(plan_id): Path<Uuid>,
    Json(input): Json<ConfirmStrategyInput>,
) -> AppResult<Json<PlanView>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = ProductionService::new(state.db);
    let plan = service
        .confirm_strategy(&current_user.0, plan_id, input)
        .await?;
    Ok(Json(plan))
}

/// Delete an unconfirmed plan
pub async fn delete_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    require_role(&current_user.0, &[Role::Admin, Role::Manager])?;
    let service = ProductionService::new(state.db);
    service.delete_plan(plan_id).await?;
    Ok(Json(()))
}
