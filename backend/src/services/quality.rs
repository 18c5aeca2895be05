//! Quality service: the two gates, hold review and lot booking

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::job::{
    append_history_tx, append_timeline_tx, fetch_job_for_update, parse_logistics, parse_step,
    JobDetail, JobRecord, JobService,
};
use shared::{
    evaluate_sample, id_suffix, JobStatus, JobStep, LogisticsStatus, PlanStatus, QcGate, QcOutcome,
    QcSnapshot, ReviewDecision, Transition, OVERRIDE_LOT_SUFFIX,
};

/// Quality service for gate inspections and admin review
#[derive(Clone)]
pub struct QualityService {
    db: PgPool,
    hold_threshold: Decimal,
}

/// Input for submitting a gate inspection
#[derive(Debug, Deserialize)]
pub struct SubmitQcInput {
    pub sample_size: i32,
    pub qty_rejected: i32,
    pub notes: Option<String>,
}

/// Input for an admin decision on a held batch
#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}

impl QualityService {
    /// Create a new QualityService instance
    pub fn new(db: PgPool, hold_threshold: Decimal) -> Self {
        Self { db, hold_threshold }
    }

    /// Jobs standing at a quality gate
    pub async fn list_pending(&self, user: &AuthUser) -> AppResult<Vec<JobRecord>> {
        let service = JobService::new(self.db.clone());
        let mut jobs = service.list_jobs(user, None).await?;
        jobs.retain(|j| {
            matches!(
                JobStep::from_str(&j.current_step),
                Some(JobStep::StitchingQcPending) | Some(JobStep::FinalQcPending)
            )
        });
        Ok(jobs)
    }

    /// Batches held for admin review
    pub async fn list_held(&self, user: &AuthUser) -> AppResult<Vec<JobRecord>> {
        let service = JobService::new(self.db.clone());
        service
            .list_jobs(user, Some(JobStatus::QcHold.as_str().to_string()))
            .await
    }

    /// Submit a gate inspection for a job.
    ///
    /// A rejection rate at or above the hold threshold parks the batch for
    /// admin review; below it the sampled rejects come off the batch and
    /// the gate's stock effect is booked.
    pub async fn submit_qc(
        &self,
        user: &AuthUser,
        job_id: Uuid,
        input: SubmitQcInput,
    ) -> AppResult<JobDetail> {
        let mut tx = self.db.begin().await?;

        let job = fetch_job_for_update(&mut tx, job_id).await?;
        if parse_logistics(&job.logistics_status)? == LogisticsStatus::InTransit {
            return Err(AppError::PhysicalReceiptRequired(format!(
                "Job {} is still in transit; book the parcel receipt before inspecting",
                job.job_number
            )));
        }
        let step = parse_step(&job.current_step)?;
        let gate = QcGate::for_step(step).ok_or_else(|| {
            AppError::InvalidStateTransition(format!(
                "Job {} is at {} and not standing at a quality gate",
                job.job_number, job.current_step
            ))
        })?;

        let outcome = evaluate_sample(
            job.total_qty,
            input.sample_size,
            input.qty_rejected,
            self.hold_threshold,
        )?;

        match outcome {
            QcOutcome::Hold { rejection_rate } => {
                let snapshot = QcSnapshot {
                    gate,
                    sample_size: input.sample_size,
                    qty_rejected: input.qty_rejected,
                    passed_qty: job.total_qty - input.qty_rejected,
                    held: true,
                    notes: input.notes,
                    inspector: user.name.clone(),
                    at: Utc::now(),
                };
                sqlx::query(
                    r#"
                    UPDATE jobs SET status = $1, current_step = $2, qc_result = $3, updated_at = now()
                    WHERE id = $4
                    "#,
                )
                .bind(JobStatus::QcHold.as_str())
                .bind(JobStep::QcReviewNeeded.as_str())
                .bind(sqlx::types::Json(&snapshot))
                .bind(job.id)
                .execute(&mut *tx)
                .await?;
                append_history_tx(
                    &mut tx,
                    job.id,
                    JobStep::QcReviewNeeded.as_str(),
                    JobStatus::QcHold.as_str(),
                    Some(&format!(
                        "{} held, rejection rate {}",
                        gate.as_str(),
                        rejection_rate
                    )),
                    &user.name,
                )
                .await?;

                tracing::warn!(
                    job = %job.job_number,
                    gate = gate.as_str(),
                    %rejection_rate,
                    "Batch held for review"
                );
            }
            QcOutcome::Pass { passed_qty } => {
                let snapshot = QcSnapshot {
                    gate,
                    sample_size: input.sample_size,
                    qty_rejected: input.qty_rejected,
                    passed_qty,
                    held: false,
                    notes: input.notes,
                    inspector: user.name.clone(),
                    at: Utc::now(),
                };
                sqlx::query("UPDATE jobs SET qc_result = $1, updated_at = now() WHERE id = $2")
                    .bind(sqlx::types::Json(&snapshot))
                    .bind(job.id)
                    .execute(&mut *tx)
                    .await?;

                apply_gate_pass(&mut tx, &job, gate, passed_qty, false, &user.name).await?;
            }
        }

        tx.commit().await?;

        let service = JobService::new(self.db.clone());
        service.get_job(user, job_id).await
    }

    /// Admin decision on a held batch: override it through, scrap it, or
    /// send it back to the floor for rework
    pub async fn review_hold(
        &self,
        user: &AuthUser,
        job_id: Uuid,
        input: ReviewInput,
    ) -> AppResult<JobDetail> {
        let mut tx = self.db.begin().await?;

        let job = fetch_job_for_update(&mut tx, job_id).await?;
        if job.status != JobStatus::QcHold.as_str() {
            return Err(AppError::InvalidStateTransition(format!(
                "Job {} is not held for review",
                job.job_number
            )));
        }
        let snapshot = job
            .qc_result
            .as_ref()
            .map(|j| j.0.clone())
            .ok_or_else(|| AppError::Internal("Held job has no inspection snapshot".to_string()))?;
        let gate = snapshot.gate;

        match input.decision {
            ReviewDecision::Approve => {
                apply_gate_pass(&mut tx, &job, gate, snapshot.passed_qty, true, &user.name).await?;
                append_timeline_tx(
                    &mut tx,
                    job.id,
                    "Quality",
                    "Hold Overridden",
                    input.notes.as_deref(),
                    &user.name,
                )
                .await?;
            }
            ReviewDecision::Reject => {
                sqlx::query("DELETE FROM product_sfg_lots WHERE job_number = $1")
                    .bind(&job.job_number)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    r#"
                    UPDATE jobs SET status = $1, current_step = $2, updated_at = now()
                    WHERE id = $3
                    "#,
                )
                .bind(JobStatus::QcRejected.as_str())
                .bind(JobStep::Scrapped.as_str())
                .bind(job.id)
                .execute(&mut *tx)
                .await?;
                append_history_tx(
                    &mut tx,
                    job.id,
                    JobStep::Scrapped.as_str(),
                    JobStatus::QcRejected.as_str(),
                    input.notes.as_deref(),
                    &user.name,
                )
                .await?;

                tracing::warn!(job = %job.job_number, "Batch scrapped after review");
            }
            ReviewDecision::Rework => {
                let rework = gate.rework_step();
                sqlx::query(
                    r#"
                    UPDATE jobs SET status = $1, current_step = $2, qc_result = NULL, updated_at = now()
                    WHERE id = $3
                    "#,
                )
                .bind(JobStatus::InProgress.as_str())
                .bind(rework.as_str())
                .bind(job.id)
                .execute(&mut *tx)
                .await?;
                append_history_tx(
                    &mut tx,
                    job.id,
                    rework.as_str(),
                    JobStatus::InProgress.as_str(),
                    input.notes.as_deref().or(Some("Sent back for rework")),
                    &user.name,
                )
                .await?;
            }
        }

        tx.commit().await?;

        let service = JobService::new(self.db.clone());
        service.get_job(user, job_id).await
    }
}

/// Book the stock effect of a passed gate and advance the job.
///
/// Gate 1 pushes a semi-finished lot; gate 2 books sellable finished goods,
/// removes the job's semi-finished lots and completes the job. Lots booked
/// through an admin override carry a suffix for downstream traceability.
pub(crate) async fn apply_gate_pass(
    tx: &mut Transaction<'_, Postgres>,
    job: &JobRecord,
    gate: QcGate,
    passed_qty: i32,
    overridden: bool,
    actor: &str,
) -> AppResult<()> {
    let suffix = if overridden { OVERRIDE_LOT_SUFFIX } else { "" };

    let transition = match gate {
        QcGate::Assembly => {
            let lot_number = format!("SFG-{}{}", id_suffix(&job.job_number), suffix);
            sqlx::query(
                r#"
                INSERT INTO product_sfg_lots (product_id, lot_number, qty, job_number)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(job.product_id)
            .bind(&lot_number)
            .bind(passed_qty)
            .bind(&job.job_number)
            .execute(&mut **tx)
            .await?;

            Transition {
                next_step: JobStep::PackagingPending,
                next_status: JobStatus::ReadyForPacking,
                enters_transit: false,
            }
        }
        QcGate::Final => {
            let lot_number = format!("FG-{}{}", id_suffix(&job.job_number), suffix);
            sqlx::query(
                r#"
                INSERT INTO product_fg_lots (product_id, lot_number, qty, inspector)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(job.product_id)
            .bind(&lot_number)
            .bind(passed_qty)
            .bind(actor)
            .execute(&mut **tx)
            .await?;

            sqlx::query(
                "UPDATE products SET warehouse_qty = warehouse_qty + $1, updated_at = now() WHERE id = $2",
            )
            .bind(passed_qty)
            .bind(job.product_id)
            .execute(&mut **tx)
            .await?;

            sqlx::query("DELETE FROM product_sfg_lots WHERE job_number = $1")
                .bind(&job.job_number)
                .execute(&mut **tx)
                .await?;

            Transition {
                next_step: JobStep::QcCompleted,
                next_status: JobStatus::Completed,
                enters_transit: false,
            }
        }
    };

    sqlx::query(
        "UPDATE jobs SET current_step = $1, status = $2, updated_at = now() WHERE id = $3",
    )
    .bind(transition.next_step.as_str())
    .bind(transition.next_status.as_str())
    .bind(job.id)
    .execute(&mut **tx)
    .await?;

    append_history_tx(
        tx,
        job.id,
        transition.next_step.as_str(),
        transition.next_status.as_str(),
        Some(&format!("{} passed, {} pieces", gate.as_str(), passed_qty)),
        actor,
    )
    .await?;

    if gate == QcGate::Final {
        complete_plan_if_done_tx(tx, job).await?;
    }

    Ok(())
}

/// Mark the owning plan completed once every one of its jobs is terminal
async fn complete_plan_if_done_tx(
    tx: &mut Transaction<'_, Postgres>,
    job: &JobRecord,
) -> AppResult<()> {
    let Some(plan_id) = job.plan_id else {
        return Ok(());
    };

    let open_jobs = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM jobs WHERE plan_id = $1 AND status NOT IN ($2, $3)",
    )
    .bind(plan_id)
    .bind(JobStatus::Completed.as_str())
    .bind(JobStatus::QcRejected.as_str())
    .fetch_one(&mut **tx)
    .await?;

    if open_jobs == 0 {
        sqlx::query(
            "UPDATE production_plans SET status = $1, updated_at = now() WHERE id = $2",
        )
        .bind(PlanStatus::Completed.as_str())
        .bind(plan_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
