//! Job service: job cards, material issuance and stage transitions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{vendor_scope, AuthUser};
use crate::services::inventory::issue_material_fifo_tx;
use shared::{
    advance, after_material_issue, receive_transition, short_ref, validate_percent,
    validate_piece_qty, HistoryEntry, IssuedMaterial, JobChannel, JobStatus, JobStep,
    LogisticsStatus, QcSnapshot, ReceivedLog, Routing, StageEvent, TimelineEntry,
    Transition, VendorDispatch,
};

/// Job service for job cards and shop-floor progress
#[derive(Clone)]
pub struct JobService {
    db: PgPool,
}

/// Job card record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobRecord {
    pub id: Uuid,
    pub job_number: String,
    pub plan_id: Option<Uuid>,
    pub product_id: Uuid,
    pub product_name: String,
    pub channel: String,
    pub is_manual: bool,
    pub total_qty: i32,
    pub status: String,
    pub current_step: String,
    pub logistics_status: String,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub routing: Option<sqlx::types::Json<Routing>>,
    pub qc_result: Option<sqlx::types::Json<QcSnapshot>>,
    pub vendor_dispatch: Option<sqlx::types::Json<VendorDispatch>>,
    pub received_log: Option<sqlx::types::Json<ReceivedLog>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Job card with its audit trail
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobRecord,
    pub history: Vec<HistoryEntry>,
    pub timeline: Vec<TimelineEntry>,
    pub issued_materials: Vec<IssuedMaterial>,
}

/// Input for reporting a shop-floor stage event
#[derive(Debug, Deserialize)]
pub struct StageUpdateInput {
    pub event: StageEvent,
    pub remarks: Option<String>,
}

/// Input for an admin forcing a stuck job to a given step
#[derive(Debug, Deserialize)]
pub struct OverrideStageInput {
    pub step: String,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Input for dispatching cut panels to a job-work vendor
#[derive(Debug, Deserialize)]
pub struct VendorDispatchInput {
    pub qty_sent: i32,
    pub wastage_percent: Decimal,
    pub transporter: Option<String>,
}

/// Input for booking a job-work parcel back in
#[derive(Debug, Deserialize)]
pub struct ReceiveParcelInput {
    pub qty_received: i32,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    step: String,
    status: String,
    remarks: Option<String>,
    actor: String,
    at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct TimelineRow {
    stage: String,
    action: String,
    details: Option<String>,
    actor: String,
    at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct IssuedMaterialRow {
    material_id: Uuid,
    material_name: String,
    lot_number: String,
    qty: Decimal,
    issued_by: String,
    at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct BomNeedRow {
    material_id: Uuid,
    material_name: String,
    qty_per_piece: Decimal,
}

const JOB_COLUMNS: &str = "j.id, j.job_number, j.plan_id, j.product_id, pr.name AS product_name, \
     j.channel, j.is_manual, j.total_qty, j.status, j.current_step, j.logistics_status, \
     j.vendor_id, j.vendor_name, j.routing, j.qc_result, j.vendor_dispatch, j.received_log, \
     j.created_by, j.created_at, j.updated_at";

impl JobService {
    /// Create a new JobService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List jobs. Vendor users only see jobs routed to their own company.
    pub async fn list_jobs(
        &self,
        user: &AuthUser,
        status: Option<String>,
    ) -> AppResult<Vec<JobRecord>> {
        let scope = vendor_scope(user);
        let jobs = sqlx::query_as::<_, JobRecord>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs j
            JOIN products pr ON pr.id = j.product_id
            WHERE ($1::uuid IS NULL OR j.vendor_id = $1)
              AND ($2::text IS NULL OR j.status = $2)
            ORDER BY j.created_at DESC
            "#
        ))
        .bind(scope)
        .bind(status)
        .fetch_all(&self.db)
        .await?;

        Ok(jobs)
    }

    /// Get one job card with its full audit trail
    pub async fn get_job(&self, user: &AuthUser, job_id: Uuid) -> AppResult<JobDetail> {
        let job = self.fetch_job(job_id).await?;

        if let Some(scope) = vendor_scope(user) {
            if job.vendor_id != Some(scope) {
                return Err(AppError::NotFound("Job".to_string()));
            }
        }

        let history = sqlx::query_as::<_, HistoryRow>(
            "SELECT step, status, remarks, actor, at FROM job_history WHERE job_id = $1 ORDER BY at",
        )
        .bind(job.id)
        .fetch_all(&self.db)
        .await?;

        let timeline = sqlx::query_as::<_, TimelineRow>(
            "SELECT stage, action, details, actor, at FROM job_timeline WHERE job_id = $1 ORDER BY at",
        )
        .bind(job.id)
        .fetch_all(&self.db)
        .await?;

        let issued = sqlx::query_as::<_, IssuedMaterialRow>(
            r#"
            SELECT material_id, material_name, lot_number, qty, issued_by, at
            FROM job_issued_materials WHERE job_id = $1 ORDER BY at
            "#,
        )
        .bind(job.id)
        .fetch_all(&self.db)
        .await?;

        Ok(JobDetail {
            job,
            history: history
                .into_iter()
                .map(|r| HistoryEntry {
                    step: r.step,
                    status: r.status,
                    remarks: r.remarks,
                    actor: r.actor,
                    at: r.at,
                })
                .collect(),
            timeline: timeline
                .into_iter()
                .map(|r| TimelineEntry {
                    stage: r.stage,
                    action: r.action,
                    details: r.details,
                    actor: r.actor,
                    at: r.at,
                })
                .collect(),
            issued_materials: issued
                .into_iter()
                .map(|r| IssuedMaterial {
                    material_id: r.material_id,
                    material_name: r.material_name,
                    lot_number: r.lot_number,
                    qty: r.qty,
                    issued_by: r.issued_by,
                    at: r.at,
                })
                .collect(),
        })
    }

    /// Issue every BOM material for a job oldest-lot-first.
    ///
    /// All-or-nothing: a product with no bill of materials, or any single
    /// material short of stock, fails the whole issuance and no lot is
    /// touched. On success the job moves to the cutting queue.
    pub async fn issue_materials(&self, user: &AuthUser, job_id: Uuid) -> AppResult<JobDetail> {
        let mut tx = self.db.begin().await?;

        let job = fetch_job_for_update(&mut tx, job_id).await?;
        let step = parse_step(&job.current_step)?;
        if step != JobStep::MaterialPending {
            return Err(AppError::InvalidStateTransition(format!(
                "Job {} is at {} and cannot take material issuance",
                job.job_number, job.current_step
            )));
        }

        let bom = sqlx::query_as::<_, BomNeedRow>(
            r#"
            SELECT b.material_id, m.name AS material_name, b.qty_per_piece
            FROM bom_lines b
            JOIN materials m ON m.id = b.material_id
            WHERE b.product_id = $1
            ORDER BY m.name
            "#,
        )
        .bind(job.product_id)
        .fetch_all(&mut *tx)
        .await?;

        if bom.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Product {} has no bill of materials",
                job.product_name
            )));
        }

        for line in &bom {
            let need = line.qty_per_piece * Decimal::from(job.total_qty);
            let draws = issue_material_fifo_tx(&mut tx, line.material_id, need).await?;

            for draw in draws {
                sqlx::query(
                    r#"
                    INSERT INTO job_issued_materials (job_id, material_id, material_name, lot_number, qty, issued_by)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(job.id)
                .bind(line.material_id)
                .bind(&line.material_name)
                .bind(&draw.lot_number)
                .bind(draw.qty_taken)
                .bind(&user.name)
                .execute(&mut *tx)
                .await?;
            }
        }

        let transition = after_material_issue();
        apply_transition_tx(&mut tx, job.id, &transition, None).await?;
        append_history_tx(
            &mut tx,
            job.id,
            transition.next_step.as_str(),
            transition.next_status.as_str(),
            Some("Materials issued"),
            &user.name,
        )
        .await?;
        append_timeline_tx(
            &mut tx,
            job.id,
            "Store",
            "Materials Issued",
            Some(&format!("{} BOM lines drawn", bom.len())),
            &user.name,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(job = %job.job_number, "Materials issued");
        self.get_job(user, job_id).await
    }

    /// Apply a shop-floor stage event through the canonical transition table
    pub async fn update_stage(
        &self,
        user: &AuthUser,
        job_id: Uuid,
        input: StageUpdateInput,
    ) -> AppResult<JobDetail> {
        let mut tx = self.db.begin().await?;

        let job = fetch_job_for_update(&mut tx, job_id).await?;
        if let Some(scope) = vendor_scope(user) {
            if job.vendor_id != Some(scope) {
                return Err(AppError::NotFound("Job".to_string()));
            }
        }

        let channel = parse_channel(&job.channel)?;
        let step = parse_step(&job.current_step)?;
        let status = parse_status(&job.status)?;

        let transition = advance(channel, step, status, input.event)?;

        let logistics = if transition.enters_transit {
            Some(LogisticsStatus::InTransit)
        } else {
            None
        };
        apply_transition_tx(&mut tx, job.id, &transition, logistics).await?;
        append_history_tx(
            &mut tx,
            job.id,
            transition.next_step.as_str(),
            transition.next_status.as_str(),
            input.remarks.as_deref(),
            &user.name,
        )
        .await?;
        append_timeline_tx(
            &mut tx,
            job.id,
            stage_of(input.event),
            input.event.as_str(),
            input.remarks.as_deref(),
            &user.name,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            job = %job.job_number,
            event = input.event.as_str(),
            step = transition.next_step.as_str(),
            "Stage updated"
        );
        self.get_job(user, job_id).await
    }

    /// Force a job to a given step, bypassing the transition table.
    ///
    /// The only recovery for a job stuck mid-stage. The override is written
    /// to the audit trail like any other transition.
    pub async fn override_stage(
        &self,
        user: &AuthUser,
        job_id: Uuid,
        input: OverrideStageInput,
    ) -> AppResult<JobDetail> {
        let mut tx = self.db.begin().await?;

        let job = fetch_job_for_update(&mut tx, job_id).await?;
        let step = parse_step(&input.step).map_err(|_| AppError::Validation {
            field: "step".to_string(),
            message: format!("Unknown step {}", input.step),
        })?;
        let status = match &input.status {
            Some(raw) => parse_status(raw).map_err(|_| AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown status {}", raw),
            })?,
            None => parse_status(&job.status)?,
        };

        sqlx::query(
            "UPDATE jobs SET current_step = $1, status = $2, updated_at = now() WHERE id = $3",
        )
        .bind(step.as_str())
        .bind(status.as_str())
        .bind(job.id)
        .execute(&mut *tx)
        .await?;
        append_history_tx(
            &mut tx,
            job.id,
            step.as_str(),
            status.as_str(),
            input.notes.as_deref().or(Some("Manual override")),
            &user.name,
        )
        .await?;
        append_timeline_tx(
            &mut tx,
            job.id,
            "Admin",
            "Stage Overridden",
            input.notes.as_deref(),
            &user.name,
        )
        .await?;

        tx.commit().await?;

        tracing::warn!(
            job = %job.job_number,
            from = %job.current_step,
            to = step.as_str(),
            "Stage manually overridden"
        );
        self.get_job(user, job_id).await
    }

    /// Record the dispatch of cut panels to a job-work vendor
    pub async fn dispatch_to_vendor(
        &self,
        user: &AuthUser,
        job_id: Uuid,
        input: VendorDispatchInput,
    ) -> AppResult<JobDetail> {
        validate_piece_qty(input.qty_sent).map_err(|msg| AppError::Validation {
            field: "qty_sent".to_string(),
            message: msg.to_string(),
        })?;
        validate_percent(input.wastage_percent).map_err(|msg| AppError::Validation {
            field: "wastage_percent".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let job = fetch_job_for_update(&mut tx, job_id).await?;
        let channel = parse_channel(&job.channel)?;
        let step = parse_step(&job.current_step)?;
        if channel != JobChannel::JobWork || step != JobStep::StitchingPending {
            return Err(AppError::InvalidStateTransition(format!(
                "Job {} is not a job-work card waiting on stitching",
                job.job_number
            )));
        }
        if input.qty_sent > job.total_qty {
            return Err(AppError::ValidationError(format!(
                "Cannot send {} pieces on a job of {}",
                input.qty_sent, job.total_qty
            )));
        }

        let vendor_name = job
            .vendor_name
            .clone()
            .ok_or_else(|| AppError::Internal("Job-work card has no vendor".to_string()))?;

        let dispatch = VendorDispatch {
            vendor_name: vendor_name.clone(),
            qty_sent: input.qty_sent,
            wastage_percent: input.wastage_percent,
            transporter: input.transporter,
            dispatched_by: user.name.clone(),
            at: Utc::now(),
        };

        sqlx::query("UPDATE jobs SET vendor_dispatch = $1, updated_at = now() WHERE id = $2")
            .bind(sqlx::types::Json(&dispatch))
            .bind(job.id)
            .execute(&mut *tx)
            .await?;
        append_timeline_tx(
            &mut tx,
            job.id,
            "Logistics",
            "Dispatched To Vendor",
            Some(&format!("{} pieces to {}", dispatch.qty_sent, vendor_name)),
            &user.name,
        )
        .await?;

        tx.commit().await?;
        self.get_job(user, job_id).await
    }

    /// Book a job-work parcel back into the factory. The handshake is the
    /// only path from in-transit to the assembly quality gate.
    pub async fn receive_parcel(
        &self,
        user: &AuthUser,
        job_id: Uuid,
        input: ReceiveParcelInput,
    ) -> AppResult<JobDetail> {
        validate_piece_qty(input.qty_received).map_err(|msg| AppError::Validation {
            field: "qty_received".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let job = fetch_job_for_update(&mut tx, job_id).await?;
        let channel = parse_channel(&job.channel)?;
        let step = parse_step(&job.current_step)?;
        let logistics = parse_logistics(&job.logistics_status)?;

        let transition = receive_transition(channel, step, logistics)?;

        let qty_sent = job
            .vendor_dispatch
            .as_ref()
            .map(|d| d.0.qty_sent)
            .unwrap_or(job.total_qty);
        let log = ReceivedLog {
            qty_received: input.qty_received,
            discrepancy: qty_sent - input.qty_received,
            received_by: user.name.clone(),
            at: Utc::now(),
        };

        apply_transition_tx(
            &mut tx,
            job.id,
            &transition,
            Some(LogisticsStatus::ReceivedAtFactory),
        )
        .await?;
        sqlx::query("UPDATE jobs SET received_log = $1, updated_at = now() WHERE id = $2")
            .bind(sqlx::types::Json(&log))
            .bind(job.id)
            .execute(&mut *tx)
            .await?;
        append_history_tx(
            &mut tx,
            job.id,
            transition.next_step.as_str(),
            transition.next_status.as_str(),
            Some("Parcel received at factory"),
            &user.name,
        )
        .await?;
        append_timeline_tx(
            &mut tx,
            job.id,
            "Logistics",
            "Parcel Received",
            Some(&format!(
                "{} received, discrepancy {}",
                log.qty_received, log.discrepancy
            )),
            &user.name,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(job = %job.job_number, qty = input.qty_received, "Parcel received");
        self.get_job(user, job_id).await
    }

    async fn fetch_job(&self, job_id: Uuid) -> AppResult<JobRecord> {
        sqlx::query_as::<_, JobRecord>(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs j
            JOIN products pr ON pr.id = j.product_id
            WHERE j.id = $1
            "#
        ))
        .bind(job_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Job".to_string()))
    }
}

/// Spawn a job card inside a transaction and log its opening history entry.
/// Returns the printable job number.
#[allow(clippy::too_many_arguments)]
pub async fn create_job_tx(
    tx: &mut Transaction<'_, Postgres>,
    plan_id: Uuid,
    product_id: Uuid,
    channel: JobChannel,
    is_manual: bool,
    total_qty: i32,
    vendor_id: Option<Uuid>,
    vendor_name: Option<String>,
    routing: Option<Routing>,
    actor: &str,
) -> AppResult<String> {
    let job_number = format!("{}-{}", channel.id_prefix(is_manual), short_ref());
    let step = channel.initial_step();

    let job_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO jobs (
            job_number, plan_id, product_id, channel, is_manual, total_qty,
            status, current_step, logistics_status, vendor_id, vendor_name, routing, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id
        "#,
    )
    .bind(&job_number)
    .bind(plan_id)
    .bind(product_id)
    .bind(channel.as_str())
    .bind(is_manual)
    .bind(total_qty)
    .bind(JobStatus::Pending.as_str())
    .bind(step.as_str())
    .bind(LogisticsStatus::AtSource.as_str())
    .bind(vendor_id)
    .bind(&vendor_name)
    .bind(routing.map(sqlx::types::Json))
    .bind(actor)
    .fetch_one(&mut **tx)
    .await?;

    append_history_tx(
        tx,
        job_id,
        step.as_str(),
        JobStatus::Pending.as_str(),
        Some("Job card created"),
        actor,
    )
    .await?;

    Ok(job_number)
}

pub(crate) async fn fetch_job_for_update(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
) -> AppResult<JobRecord> {
    sqlx::query_as::<_, JobRecord>(&format!(
        r#"
        SELECT {JOB_COLUMNS}
        FROM jobs j
        JOIN products pr ON pr.id = j.product_id
        WHERE j.id = $1
        FOR UPDATE OF j
        "#
    ))
    .bind(job_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Job".to_string()))
}

pub(crate) async fn apply_transition_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    transition: &Transition,
    logistics: Option<LogisticsStatus>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET current_step = $1, status = $2,
            logistics_status = COALESCE($3, logistics_status),
            updated_at = now()
        WHERE id = $4
        "#,
    )
    .bind(transition.next_step.as_str())
    .bind(transition.next_status.as_str())
    .bind(logistics.map(|l| l.as_str()))
    .bind(job_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn append_history_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    step: &str,
    status: &str,
    remarks: Option<&str>,
    actor: &str,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO job_history (job_id, step, status, remarks, actor) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(job_id)
    .bind(step)
    .bind(status)
    .bind(remarks)
    .bind(actor)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) async fn append_timeline_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
    stage: &str,
    action: &str,
    details: Option<&str>,
    actor: &str,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO job_timeline (job_id, stage, action, details, actor) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(job_id)
    .bind(stage)
    .bind(action)
    .bind(details)
    .bind(actor)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub(crate) fn parse_channel(s: &str) -> AppResult<JobChannel> {
    JobChannel::from_str(s).ok_or_else(|| AppError::Internal(format!("Unknown channel {}", s)))
}

pub(crate) fn parse_step(s: &str) -> AppResult<JobStep> {
    JobStep::from_str(s).ok_or_else(|| AppError::Internal(format!("Unknown step {}", s)))
}

pub(crate) fn parse_status(s: &str) -> AppResult<JobStatus> {
    JobStatus::from_str(s).ok_or_else(|| AppError::Internal(format!("Unknown status {}", s)))
}

pub(crate) fn parse_logistics(s: &str) -> AppResult<LogisticsStatus> {
    LogisticsStatus::from_str(s)
        .ok_or_else(|| AppError::Internal(format!("Unknown logistics status {}", s)))
}

fn stage_of(event: StageEvent) -> &'static str {
    match event {
        StageEvent::CuttingStarted | StageEvent::CuttingCompleted => "Cutting",
        StageEvent::SewingStarted | StageEvent::StitchingCompleted => "Stitching",
        StageEvent::PackagingStarted | StageEvent::PackagingCompleted => "Packaging",
    }
}
