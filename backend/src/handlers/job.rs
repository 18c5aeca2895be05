//! HTTP handlers for job card endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::production::StatusFilter;
use crate::middleware::{require_role, CurrentUser};
use crate::services::job::{
    JobDetail, JobRecord, JobService, OverrideStageInput, ReceiveParcelInput, StageUpdateInput,
    VendorDispatchInput,
};
use crate::AppState;
use shared::Role;

/// List job cards; vendors only see their own
pub async fn list_jobs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<JobRecord>>> {
    let service = JobService::new(state.db);
    let jobs = service.list_jobs(&current_user.0, filter.status).await?;
    Ok(Json(jobs))
}

/// Get one job card with its history and timeline
pub async fn get_job(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<JobDetail>> {
    let service = JobService::new(state.db);
    let job = service.get_job(&current_user.0, job_id).await?;
    Ok(Json(job))
}

/// Issue materials against a job's bill of materials
pub async fn issue_materials(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<JobDetail>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Store],
    )?;
    let service = JobService::new(state.db);
    let job = service.issue_materials(&current_user.0, job_id).await?;
    Ok(Json(job))
}

/// Apply a shop-floor stage event to a job
pub async fn update_stage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<StageUpdateInput>,
) -> AppResult<Json<JobDetail>> {
    let service = JobService::new(state.db);
    let job = service.update_stage(&current_user.0, job_id, input).await?;
    Ok(Json(job))
}

/// Force a stuck job to a given step (admin only)
pub async fn override_stage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<OverrideStageInput>,
) -> AppResult<Json<JobDetail>> {
    require_role(&current_user.0, &[Role::Admin])?;
    let service = JobService::new(state.db);
    let job = service
        .override_stage(&current_user.0, job_id, input)
        .await?;
    Ok(Json(job))
}

/// Record a dispatch of cut panels to a job-work vendor
pub async fn dispatch_to_vendor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<VendorDispatchInput>,
) -> AppResult<Json<JobDetail>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Store],
    )?;
    let service = JobService::new(state.db);
    let job = service
        .dispatch_to_vendor(&current_user.0, job_id, input)
        .await?;
    Ok(Json(job))
}

/// Receive a stitched parcel back from a job-work vendor
pub async fn receive_parcel(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<ReceiveParcelInput>,
) -> AppResult<Json<JobDetail>> {
    require_role(
        &current_user.0,
        &[Role::Admin, Role::Manager, Role::Store],
    )?;
    let service = JobService::new(state.db);
    let job = service
        .receive_parcel(&current_user.0, job_id, input)
        .await?;
    Ok(Json(job))
}
