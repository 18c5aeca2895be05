//! HTTP handlers for quality gate endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_role, CurrentUser};
use crate::services::job::{JobDetail, JobRecord};
use crate::services::quality::{QualityService, ReviewInput, SubmitQcInput};
use crate::AppState;
use shared::Role;

/// Jobs standing at a quality gate
pub async fn list_pending(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<JobRecord>>> {
    let service = QualityService::new(state.db, state.config.hold_threshold());
    let jobs = service.list_pending(&current_user.0).await?;
    Ok(Json(jobs))
}

/// Batches held for admin review
pub async fn list_held(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<JobRecord>>> {
    let service = QualityService::new(state.db, state.config.hold_threshold());
    let jobs = service.list_held(&current_user.0).await?;
    Ok(Json(jobs))
}

/// Submit a gate inspection for a job
pub async fn submit_qc(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<SubmitQcInput>,
) -> AppResult<Json<JobDetail>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Inspector],
    )?;
    let service = QualityService::new(state.db, state.config.hold_threshold());
    let job = service.submit_qc(&current_user.0, job_id, input).await?;
    Ok(Json(job))
}

/// Admin decision on a held batch
pub async fn review_hold(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<ReviewInput>,
) -> AppResult<Json<JobDetail>> {
    require_role(&current_user.0, &[Role::Admin])?;
    let service = QualityService::new(state.db, state.config.hold_threshold());
    let job = service.review_hold(&current_user.0, job_id, input).await?;
    Ok(Json(job))
}
