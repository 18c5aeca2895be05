//! Production planning service: plan lifecycle and strategy confirmation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::job::create_job_tx;
use shared::{
    allocation_ceiling, reorder_target, short_ref, status_after_confirmation, validate_piece_qty,
    validate_splits, JobChannel, PlanStatus, Routing, RoutingMode, SplitMode, SplitRecord,
};

/// Production planning service
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// Production plan record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PlanRecord {
    pub id: Uuid,
    pub plan_number: String,
    pub product_id: Uuid,
    pub product_name: String,
    /// Order line this waterfall plan covers; absent for manual builds
    pub order_item_id: Option<Uuid>,
    /// Order-driven quantity this plan must cover
    pub qty_to_produce: i32,
    /// Quantity committed across confirmed splits
    pub planned_qty: i32,
    pub dispatched_qty: i32,
    pub status: String,
    /// "Waterfall" for allocation-generated plans, "Manual" for stock builds
    pub source: String,
    pub splits: sqlx::types::Json<Vec<SplitRecord>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Plan with its committable ceiling computed at read time
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: PlanRecord,
    pub ceiling: i32,
}

/// Input for a manual stock-build plan
#[derive(Debug, Deserialize)]
pub struct CreateManualPlanInput {
    pub product_id: Uuid,
    pub qty: i32,
}

/// Input for confirming a sourcing strategy on a plan
#[derive(Debug, Deserialize)]
pub struct ConfirmStrategyInput {
    pub splits: Vec<SplitInput>,
}

#[derive(Debug, Deserialize)]
pub struct SplitInput {
    pub qty: i32,
    pub mode: SplitMode,
    pub vendor_id: Option<Uuid>,
    pub unit_cost: Decimal,
    /// Required for manufacturing splits
    pub routing: Option<Routing>,
}

#[derive(Debug, FromRow)]
struct ProductPlanningRow {
    name: String,
    avg_daily_consumption: Decimal,
    lead_time_days: i32,
    safety_multiplier: Decimal,
    warehouse_qty: i32,
}

const PLAN_COLUMNS: &str = "p.id, p.plan_number, p.product_id, pr.name AS product_name, \
     p.order_item_id, p.qty_to_produce, p.planned_qty, p.dispatched_qty, p.status, p.source, \
     p.splits, p.created_by, p.created_at, p.updated_at";

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List plans, optionally filtered by status
    pub async fn list_plans(&self, status: Option<String>) -> AppResult<Vec<PlanView>> {
        let plans = match status {
            Some(status) => {
                sqlx::query_as::<_, PlanRecord>(&format!(
                    r#"
                    SELECT {PLAN_COLUMNS}
                    FROM production_plans p
                    JOIN products pr ON pr.id = p.product_id
                    WHERE p.status = $1
                    ORDER BY p.created_at DESC
                    "#
                ))
                .bind(status)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, PlanRecord>(&format!(
                    r#"
                    SELECT {PLAN_COLUMNS}
                    FROM production_plans p
                    JOIN products pr ON pr.id = p.product_id
                    ORDER BY p.created_at DESC
                    "#
                ))
                .fetch_all(&self.db)
                .await?
            }
        };

        let mut views = Vec::with_capacity(plans.len());
        for plan in plans {
            let ceiling = self.plan_ceiling(&plan).await?;
            views.push(PlanView { plan, ceiling });
        }
        Ok(views)
    }

    /// Get one plan with its ceiling
    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<PlanView> {
        let plan = sqlx::query_as::<_, PlanRecord>(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM production_plans p
            JOIN products pr ON pr.id = p.product_id
            WHERE p.id = $1
            "#
        ))
        .bind(plan_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Production plan".to_string()))?;

        let ceiling = self.plan_ceiling(&plan).await?;
        Ok(PlanView { plan, ceiling })
    }

    /// Create a manual stock-build plan, outside the order-driven waterfall
    pub async fn create_manual_plan(
        &self,
        user: &AuthUser,
        input: CreateManualPlanInput,
    ) -> AppResult<PlanView> {
        validate_piece_qty(input.qty).map_err(|msg| AppError::Validation {
            field: "qty".to_string(),
            message: msg.to_string(),
        })?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
        )
        .bind(input.product_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let plan_number = format!("PP-{}", short_ref());
        let plan_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO production_plans (plan_number, product_id, qty_to_produce, status, source, created_by)
            VALUES ($1, $2, $3, $4, 'Manual', $5)
            RETURNING id
            "#,
        )
        .bind(&plan_number)
        .bind(input.product_id)
        .bind(input.qty)
        .bind(PlanStatus::PendingStrategy.as_str())
        .bind(&user.name)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(plan = %plan_number, qty = input.qty, "Manual stock-build plan created");
        self.get_plan(plan_id).await
    }

    /// Confirm a sourcing strategy on a plan.
    ///
    /// Each split spawns a job card on its channel. The total committed
    /// quantity is capped by the plan's ceiling: the outstanding order
    /// shortfall plus a refill of the warehouse up to its reorder target.
    pub async fn confirm_strategy(
        &self,
        user: &AuthUser,
        plan_id: Uuid,
        input: ConfirmStrategyInput,
    ) -> AppResult<PlanView> {
        let mut tx = self.db.begin().await?;

        let plan = sqlx::query_as::<_, PlanRecord>(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM production_plans p
            JOIN products pr ON pr.id = p.product_id
            WHERE p.id = $1
            FOR UPDATE OF p
            "#
        ))
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Production plan".to_string()))?;

        let plan_status = PlanStatus::from_str(&plan.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown plan status {}", plan.status)))?;
        if !matches!(
            plan_status,
            PlanStatus::PendingStrategy | PlanStatus::PartiallyPlanned
        ) {
            return Err(AppError::InvalidStateTransition(format!(
                "Plan {} is {} and cannot take further strategy",
                plan.plan_number, plan.status
            )));
        }

        let product = sqlx::query_as::<_, ProductPlanningRow>(
            r#"
            SELECT name, avg_daily_consumption, lead_time_days, safety_multiplier, warehouse_qty
            FROM products WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(plan.product_id)
        .fetch_one(&mut *tx)
        .await?;

        let ceiling = ceiling_for(&plan, &product);
        let quantities: Vec<i32> = input.splits.iter().map(|s| s.qty).collect();
        let committed: i64 = quantities.iter().map(|&q| q as i64).sum();
        validate_splits(&quantities, ceiling).map_err(|msg| {
            if committed > ceiling as i64 {
                AppError::OverCommit(format!(
                    "Splits commit {} pieces but only {} can be planned for {}",
                    committed, ceiling, product.name
                ))
            } else {
                AppError::ValidationError(msg.to_string())
            }
        })?;

        let mut split_records = plan.splits.0.clone();
        for split in &input.splits {
            let (channel, vendor_id) = match split.mode {
                SplitMode::FullBuy => {
                    let vendor_id = split.vendor_id.ok_or_else(|| AppError::Validation {
                        field: "splits.vendor_id".to_string(),
                        message: "Full-buy splits need a trading vendor".to_string(),
                    })?;
                    (JobChannel::FullBuy, Some(vendor_id))
                }
                SplitMode::Manufacturing => {
                    let routing = split.routing.as_ref().ok_or_else(|| AppError::Validation {
                        field: "splits.routing".to_string(),
                        message: "Manufacturing splits need a stage routing".to_string(),
                    })?;
                    if routing.stitching.mode == RoutingMode::JobWork {
                        let vendor_id =
                            split.vendor_id.ok_or_else(|| AppError::Validation {
                                field: "splits.vendor_id".to_string(),
                                message: "Job-work routing needs a vendor".to_string(),
                            })?;
                        (JobChannel::JobWork, Some(vendor_id))
                    } else {
                        (JobChannel::InHouse, None)
                    }
                }
            };

            let vendor_name = match vendor_id {
                Some(id) => Some(
                    sqlx::query_scalar::<_, String>("SELECT name FROM vendors WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Vendor".to_string()))?,
                ),
                None => None,
            };

            let job_number = create_job_tx(
                &mut tx,
                plan.id,
                plan.product_id,
                channel,
                plan.source == "Manual",
                split.qty,
                vendor_id,
                vendor_name.clone(),
                split.routing.clone(),
                &user.name,
            )
            .await?;

            split_records.push(SplitRecord {
                qty: split.qty,
                mode: split.mode,
                vendor_id,
                vendor_name,
                unit_cost: split.unit_cost,
                routing: split.routing.clone(),
                job_id: job_number,
                created_at: Utc::now(),
            });
        }

        let new_planned = plan.planned_qty + committed as i32;
        let new_status = status_after_confirmation(new_planned, plan.qty_to_produce);

        sqlx::query(
            r#"
            UPDATE production_plans
            SET planned_qty = $1, status = $2, splits = $3, updated_at = now()
            WHERE id = $4
            "#,
        )
        .bind(new_planned)
        .bind(new_status.as_str())
        .bind(sqlx::types::Json(&split_records))
        .bind(plan.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            plan = %plan.plan_number,
            committed,
            status = new_status.as_str(),
            "Strategy confirmed"
        );
        self.get_plan(plan_id).await
    }

    /// Delete a plan that has not been given a strategy yet
    pub async fn delete_plan(&self, plan_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM production_plans WHERE id = $1 AND status = $2",
        )
        .bind(plan_id)
        .bind(PlanStatus::PendingStrategy.as_str())
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM production_plans WHERE id = $1)",
            )
            .bind(plan_id)
            .fetch_one(&self.db)
            .await?;
            if exists {
                return Err(AppError::InvalidStateTransition(
                    "Only plans awaiting strategy can be deleted".to_string(),
                ));
            }
            return Err(AppError::NotFound("Production plan".to_string()));
        }

        Ok(())
    }

    async fn plan_ceiling(&self, plan: &PlanRecord) -> AppResult<i32> {
        let product = sqlx::query_as::<_, ProductPlanningRow>(
            r#"
            SELECT name, avg_daily_consumption, lead_time_days, safety_multiplier, warehouse_qty
            FROM products WHERE id = $1
            "#,
        )
        .bind(plan.product_id)
        .fetch_one(&self.db)
        .await?;

        Ok(ceiling_for(plan, &product))
    }
}

/// Committable ceiling for a plan. Waterfall plans may also refill the
/// warehouse up to its reorder target; manual stock builds are capped at
/// exactly the quantity they asked for.
fn ceiling_for(plan: &PlanRecord, product: &ProductPlanningRow) -> i32 {
    if plan.source == "Manual" {
        return (plan.qty_to_produce - plan.planned_qty - plan.dispatched_qty).max(0);
    }
    let target = reorder_target(
        product.avg_daily_consumption,
        product.lead_time_days,
        product.safety_multiplier,
    );
    allocation_ceiling(
        plan.qty_to_produce,
        plan.planned_qty,
        plan.dispatched_qty,
        target,
        product.warehouse_qty,
    )
}

/// Regenerate waterfall plans for a product's unmet demand inside a
/// transaction. Waterfall plans still awaiting strategy are replaced with
/// one plan per order line that still needs production; confirmed plans
/// are left alone.
pub async fn regenerate_waterfall_plans_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    demands: &[(Uuid, i32)],
    actor: &str,
) -> AppResult<()> {
    sqlx::query(
        "DELETE FROM production_plans WHERE product_id = $1 AND source = 'Waterfall' AND status = $2",
    )
    .bind(product_id)
    .bind(PlanStatus::PendingStrategy.as_str())
    .execute(&mut **tx)
    .await?;

    for (order_item_id, qty_to_produce) in demands {
        if *qty_to_produce <= 0 {
            continue;
        }
        let plan_number = format!("PP-{}", short_ref());
        sqlx::query(
            r#"
            INSERT INTO production_plans (plan_number, product_id, order_item_id, qty_to_produce, status, source, created_by)
            VALUES ($1, $2, $3, $4, $5, 'Waterfall', $6)
            "#,
        )
        .bind(&plan_number)
        .bind(product_id)
        .bind(order_item_id)
        .bind(qty_to_produce)
        .bind(PlanStatus::PendingStrategy.as_str())
        .bind(actor)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Record dispatched pieces against the plan covering an order line,
/// falling back to the product's most recent open plan. A plan covered
/// entirely by existing stock settles as fulfilled by stock.
pub async fn record_plan_dispatch_tx(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    order_item_id: Uuid,
    qty: i32,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE production_plans
        SET dispatched_qty = dispatched_qty + $1,
            status = CASE
                WHEN dispatched_qty + $1 >= qty_to_produce AND planned_qty = 0
                    THEN $5
                ELSE status
            END,
            updated_at = now()
        WHERE id = (
            SELECT id FROM production_plans
            WHERE product_id = $2 AND status NOT IN ($3, $4)
            ORDER BY (order_item_id = $6) DESC NULLS LAST, created_at DESC
            LIMIT 1
        )
        "#,
    )
    .bind(qty)
    .bind(product_id)
    .bind(PlanStatus::Completed.as_str())
    .bind(PlanStatus::FulfilledByStock.as_str())
    .bind(PlanStatus::FulfilledByStock.as_str())
    .bind(order_item_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
