//! Purchasing service: purchase orders, incoming receipts with gate QC,
//! vendor balances and the surplus ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::inventory::receive_material_lot_tx;
use crate::services::job::{append_history_tx, parse_step};
use crate::services::orders::run_waterfall_tx;
use shared::{
    net_receipt_value, remaining_surplus, short_ref, validate_lot_number, validate_measured_qty,
    validate_receipt_breakdown, whole_units, ItemKind, JobStatus, JobStep, PoStatus,
    ReceiptBreakdown, OVERRIDE_LOT_SUFFIX,
};

/// Purchasing service
#[derive(Clone)]
pub struct PurchasingService {
    db: PgPool,
    hold_threshold: Decimal,
}

/// Purchase order record, one bought item per order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PoRecord {
    pub id: Uuid,
    pub po_number: String,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub item_kind: String,
    pub item_id: Uuid,
    pub item_name: String,
    pub qty_ordered: Decimal,
    pub qty_received: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub gst_percent: Decimal,
    pub status: String,
    pub plan_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One booked or held receipt against a purchase order
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReceiptRecord {
    pub id: Uuid,
    pub po_id: Uuid,
    pub lot_number: String,
    pub qty: Decimal,
    pub no_of_boxes: i32,
    pub qty_per_box: i32,
    pub loose_qty: i32,
    pub sample_size: Option<i32>,
    pub qty_rejected: Option<i32>,
    pub held: bool,
    pub net_value: Decimal,
    pub bill_number: Option<String>,
    pub received_on: Option<NaiveDate>,
    pub received_by: String,
    pub at: DateTime<Utc>,
}

/// Purchase order with its receipts
#[derive(Debug, Clone, Serialize)]
pub struct PoDetail {
    #[serde(flatten)]
    pub po: PoRecord,
    pub receipts: Vec<ReceiptRecord>,
}

/// Input for raising a purchase order
#[derive(Debug, Deserialize)]
pub struct CreatePoInput {
    pub vendor_id: Uuid,
    pub item_kind: ItemKind,
    pub item_id: Uuid,
    pub qty_ordered: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub gst_percent: Decimal,
    /// Full-buy job this order sources; raising the PO moves the job on
    pub job_id: Option<Uuid>,
}

/// Input for booking a receipt against a purchase order
#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub qty: Decimal,
    pub lot_number: Option<String>,
    pub bill_number: Option<String>,
    pub received_on: Option<NaiveDate>,
    /// Box and loose breakdown, required for finished goods
    pub breakdown: Option<ReceiptBreakdown>,
    /// Incoming-QC sample; omitted for trusted raw receipts
    pub qc: Option<ReceiptQcInput>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptQcInput {
    pub sample_size: i32,
    pub qty_rejected: i32,
}

/// Input for the admin decision on a held receipt
#[derive(Debug, Deserialize)]
pub struct ReceiptReviewInput {
    pub approve: bool,
    pub notes: Option<String>,
}

/// One surplus ledger line with how much of it is still in stock
#[derive(Debug, Clone, Serialize)]
pub struct SurplusReportLine {
    pub po_number: String,
    pub item_kind: String,
    pub item_name: String,
    pub lot_number: String,
    pub surplus_qty: Decimal,
    pub remaining_qty: Decimal,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SurplusRow {
    po_number: String,
    item_kind: String,
    item_id: Uuid,
    item_name: String,
    lot_number: String,
    surplus_qty: Decimal,
    recorded_by: String,
    created_at: DateTime<Utc>,
}

const PO_COLUMNS: &str = "id, po_number, vendor_id, vendor_name, item_kind, item_id, item_name, \
     qty_ordered, qty_received, unit_price, discount_percent, gst_percent, status, plan_id, \
     job_id, created_by, created_at, updated_at";

const RECEIPT_COLUMNS: &str = "id, po_id, lot_number, qty, no_of_boxes, qty_per_box, loose_qty, \
     sample_size, qty_rejected, held, net_value, bill_number, received_on, received_by, at";

impl PurchasingService {
    /// Create a new PurchasingService instance
    pub fn new(db: PgPool, hold_threshold: Decimal) -> Self {
        Self { db, hold_threshold }
    }

    /// Raise a purchase order
    pub async fn create_po(&self, user: &AuthUser, input: CreatePoInput) -> AppResult<PoDetail> {
        validate_measured_qty(input.qty_ordered).map_err(|msg| AppError::Validation {
            field: "qty_ordered".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let vendor_name =
            sqlx::query_scalar::<_, String>("SELECT name FROM vendors WHERE id = $1")
                .bind(input.vendor_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Vendor".to_string()))?;

        let (item_name, plan_id) = match input.item_kind {
            ItemKind::RawMaterial => {
                let name =
                    sqlx::query_scalar::<_, String>("SELECT name FROM materials WHERE id = $1")
                        .bind(input.item_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;
                (name, None)
            }
            ItemKind::FinishedGood => {
                let name =
                    sqlx::query_scalar::<_, String>("SELECT name FROM products WHERE id = $1")
                        .bind(input.item_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
                let plan_id = match input.job_id {
                    Some(job_id) => sqlx::query_scalar::<_, Option<Uuid>>(
                        "SELECT plan_id FROM jobs WHERE id = $1",
                    )
                    .bind(job_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .flatten(),
                    None => None,
                };
                (name, plan_id)
            }
        };

        // A PO against a full-buy job moves the job out of procurement
        if let Some(job_id) = input.job_id {
            let job = sqlx::query_as::<_, (String, String)>(
                "SELECT job_number, current_step FROM jobs WHERE id = $1 FOR UPDATE",
            )
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Job".to_string()))?;

            if parse_step(&job.1)? != JobStep::ProcurementPending {
                return Err(AppError::InvalidStateTransition(format!(
                    "Job {} is not waiting on procurement",
                    job.0
                )));
            }

            sqlx::query(
                "UPDATE jobs SET current_step = $1, status = $2, updated_at = now() WHERE id = $3",
            )
            .bind(JobStep::PoRaised.as_str())
            .bind(JobStatus::InProgress.as_str())
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
            append_history_tx(
                &mut tx,
                job_id,
                JobStep::PoRaised.as_str(),
                JobStatus::InProgress.as_str(),
                Some("Purchase order raised"),
                &user.name,
            )
            .await?;
        }

        let po_number = format!("PO-{}", short_ref());
        let po_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_orders (
                po_number, vendor_id, vendor_name, item_kind, item_id, item_name,
                qty_ordered, unit_price, discount_percent, gst_percent, status,
                plan_id, job_id, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            "#,
        )
        .bind(&po_number)
        .bind(input.vendor_id)
        .bind(&vendor_name)
        .bind(input.item_kind.as_str())
        .bind(input.item_id)
        .bind(&item_name)
        .bind(input.qty_ordered)
        .bind(input.unit_price)
        .bind(input.discount_percent)
        .bind(input.gst_percent)
        .bind(PoStatus::Pending.as_str())
        .bind(plan_id)
        .bind(input.job_id)
        .bind(&user.name)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(po = %po_number, vendor = %vendor_name, "Purchase order raised");
        self.get_po(po_id).await
    }

    /// List purchase orders, optionally filtered by status
    pub async fn list_pos(&self, status: Option<String>) -> AppResult<Vec<PoRecord>> {
        let pos = sqlx::query_as::<_, PoRecord>(&format!(
            r#"
            SELECT {PO_COLUMNS} FROM purchase_orders
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(status)
        .fetch_all(&self.db)
        .await?;

        Ok(pos)
    }

    /// Get one purchase order with its receipts
    pub async fn get_po(&self, po_id: Uuid) -> AppResult<PoDetail> {
        let po = sqlx::query_as::<_, PoRecord>(&format!(
            "SELECT {PO_COLUMNS} FROM purchase_orders WHERE id = $1"
        ))
        .bind(po_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let receipts = sqlx::query_as::<_, ReceiptRecord>(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM purchase_receipts WHERE po_id = $1 ORDER BY at"
        ))
        .bind(po_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PoDetail { po, receipts })
    }

    /// Book a receipt against a purchase order.
    ///
    /// A sampled rejection rate at or above the hold threshold parks the
    /// whole receipt for admin review without touching stock or the vendor
    /// balance. Otherwise stock, vendor balance, over-receipt surplus and
    /// any linked full-buy job are all settled in one transaction.
    pub async fn receive(
        &self,
        user: &AuthUser,
        po_id: Uuid,
        input: ReceiveInput,
    ) -> AppResult<PoDetail> {
        validate_measured_qty(input.qty).map_err(|msg| AppError::Validation {
            field: "qty".to_string(),
            message: msg.to_string(),
        })?;
        if let Some(lot) = &input.lot_number {
            validate_lot_number(lot).map_err(|msg| AppError::Validation {
                field: "lot_number".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let po = sqlx::query_as::<_, PoRecord>(&format!(
            "SELECT {PO_COLUMNS} FROM purchase_orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(po_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let status = PoStatus::from_str(&po.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown PO status {}", po.status)))?;
        if !matches!(status, PoStatus::Pending | PoStatus::Partial) {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order {} is {} and cannot take receipts",
                po.po_number, po.status
            )));
        }

        let kind = ItemKind::from_str(&po.item_kind)
            .ok_or_else(|| AppError::Internal(format!("Unknown item kind {}", po.item_kind)))?;

        let breakdown = match kind {
            ItemKind::FinishedGood => {
                let breakdown = input.breakdown.ok_or_else(|| AppError::Validation {
                    field: "breakdown".to_string(),
                    message: "Finished-goods receipts need a box and loose breakdown".to_string(),
                })?;
                let pieces = whole_units(input.qty).ok_or_else(|| AppError::Validation {
                    field: "qty".to_string(),
                    message: "Finished goods are received in whole pieces".to_string(),
                })?;
                validate_receipt_breakdown(
                    pieces,
                    breakdown.no_of_boxes,
                    breakdown.qty_per_box,
                    breakdown.loose_qty,
                )
                .map_err(|msg| AppError::Validation {
                    field: "breakdown".to_string(),
                    message: msg.to_string(),
                })?;
                breakdown
            }
            ItemKind::RawMaterial => ReceiptBreakdown {
                no_of_boxes: 0,
                qty_per_box: 0,
                loose_qty: 0,
            },
        };

        let lot_number = input
            .lot_number
            .unwrap_or_else(|| format!("LOT-{}", short_ref()));
        let net_value = net_receipt_value(
            input.qty,
            po.unit_price,
            po.discount_percent,
            po.gst_percent,
        );

        // Incoming QC: a bad sample holds the whole receipt
        let mut held = false;
        if let Some(qc) = &input.qc {
            let pieces = whole_units(input.qty).ok_or_else(|| AppError::Validation {
                field: "qty".to_string(),
                message: "Sampled receipts are counted in whole units".to_string(),
            })?;
            let outcome =
                shared::evaluate_sample(pieces, qc.sample_size, qc.qty_rejected, self.hold_threshold)?;
            held = matches!(outcome, shared::QcOutcome::Hold { .. });
        }

        sqlx::query(
            r#"
            INSERT INTO purchase_receipts (
                po_id, lot_number, qty, no_of_boxes, qty_per_box, loose_qty,
                sample_size, qty_rejected, held, net_value, bill_number,
                received_on, received_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(po.id)
        .bind(&lot_number)
        .bind(input.qty)
        .bind(breakdown.no_of_boxes)
        .bind(breakdown.qty_per_box)
        .bind(breakdown.loose_qty)
        .bind(input.qc.as_ref().map(|q| q.sample_size))
        .bind(input.qc.as_ref().map(|q| q.qty_rejected))
        .bind(held)
        .bind(net_value)
        .bind(&input.bill_number)
        .bind(input.received_on)
        .bind(&user.name)
        .execute(&mut *tx)
        .await?;

        if held {
            sqlx::query(
                "UPDATE purchase_orders SET status = $1, updated_at = now() WHERE id = $2",
            )
            .bind(PoStatus::QcReview.as_str())
            .bind(po.id)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            tracing::warn!(po = %po.po_number, "Receipt held for review");
            return self.get_po(po_id).await;
        }

        book_receipt_tx(
            &mut tx,
            &po,
            kind,
            &lot_number,
            input.qty,
            &breakdown,
            net_value,
            &user.name,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(po = %po.po_number, qty = %input.qty, "Receipt booked");
        self.get_po(po_id).await
    }

    /// Admin decision on a held receipt. Approval books the held quantity
    /// under a suffixed lot; rejection terminates the purchase order.
    pub async fn review_receipt(
        &self,
        user: &AuthUser,
        po_id: Uuid,
        input: ReceiptReviewInput,
    ) -> AppResult<PoDetail> {
        let mut tx = self.db.begin().await?;

        let po = sqlx::query_as::<_, PoRecord>(&format!(
            "SELECT {PO_COLUMNS} FROM purchase_orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(po_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        if po.status != PoStatus::QcReview.as_str() {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase order {} is not held for review",
                po.po_number
            )));
        }

        let receipt = sqlx::query_as::<_, ReceiptRecord>(&format!(
            r#"
            SELECT {RECEIPT_COLUMNS} FROM purchase_receipts
            WHERE po_id = $1 AND held = true
            ORDER BY at DESC
            LIMIT 1
            "#
        ))
        .bind(po.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Internal("Held order has no held receipt".to_string()))?;

        if input.approve {
            let kind = ItemKind::from_str(&po.item_kind)
                .ok_or_else(|| AppError::Internal(format!("Unknown item kind {}", po.item_kind)))?;
            let lot_number = format!("{}{}", receipt.lot_number, OVERRIDE_LOT_SUFFIX);
            let breakdown = ReceiptBreakdown {
                no_of_boxes: receipt.no_of_boxes,
                qty_per_box: receipt.qty_per_box,
                loose_qty: receipt.loose_qty,
            };

            sqlx::query("UPDATE purchase_receipts SET held = false, lot_number = $1 WHERE id = $2")
                .bind(&lot_number)
                .bind(receipt.id)
                .execute(&mut *tx)
                .await?;

            book_receipt_tx(
                &mut tx,
                &po,
                kind,
                &lot_number,
                receipt.qty,
                &breakdown,
                receipt.net_value,
                &user.name,
            )
            .await?;

            tracing::info!(po = %po.po_number, "Held receipt overridden and booked");
        } else {
            sqlx::query(
                "UPDATE purchase_orders SET status = $1, updated_at = now() WHERE id = $2",
            )
            .bind(PoStatus::Rejected.as_str())
            .bind(po.id)
            .execute(&mut *tx)
            .await?;

            tracing::warn!(po = %po.po_number, "Held receipt rejected, order terminated");
        }

        tx.commit().await?;
        self.get_po(po_id).await
    }

    /// Surplus report: every over-receipt with how much of it is still
    /// sitting in its lot. Surplus drains as the lot is consumed.
    pub async fn surplus_report(&self) -> AppResult<Vec<SurplusReportLine>> {
        let rows = sqlx::query_as::<_, SurplusRow>(
            r#"
            SELECT po_number, item_kind, item_id, item_name, lot_number, surplus_qty,
                   recorded_by, created_at
            FROM surplus_ledger
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut report = Vec::with_capacity(rows.len());
        for row in rows {
            let current_qty = match ItemKind::from_str(&row.item_kind) {
                Some(ItemKind::RawMaterial) => sqlx::query_scalar::<_, Option<Decimal>>(
                    "SELECT SUM(qty) FROM material_lots WHERE material_id = $1 AND lot_number = $2",
                )
                .bind(row.item_id)
                .bind(&row.lot_number)
                .fetch_one(&self.db)
                .await?
                .unwrap_or(Decimal::ZERO),
                _ => sqlx::query_scalar::<_, Option<i64>>(
                    "SELECT SUM(qty) FROM product_fg_lots WHERE product_id = $1 AND lot_number LIKE $2 || '%'",
                )
                .bind(row.item_id)
                .bind(&row.lot_number)
                .fetch_one(&self.db)
                .await?
                .map(Decimal::from)
                .unwrap_or(Decimal::ZERO),
            };

            report.push(SurplusReportLine {
                po_number: row.po_number,
                item_kind: row.item_kind,
                item_name: row.item_name,
                lot_number: row.lot_number,
                surplus_qty: row.surplus_qty,
                remaining_qty: remaining_surplus(row.surplus_qty, current_qty),
                recorded_by: row.recorded_by,
                created_at: row.created_at,
            });
        }

        Ok(report)
    }
}

/// Book an accepted receipt: stock in, vendor balance up, over-receipt into
/// the surplus ledger, purchase order and any linked full-buy job settled.
#[allow(clippy::too_many_arguments)]
async fn book_receipt_tx(
    tx: &mut Transaction<'_, Postgres>,
    po: &PoRecord,
    kind: ItemKind,
    lot_number: &str,
    qty: Decimal,
    breakdown: &ReceiptBreakdown,
    net_value: Decimal,
    actor: &str,
) -> AppResult<()> {
    match kind {
        ItemKind::RawMaterial => {
            receive_material_lot_tx(tx, po.item_id, lot_number, qty).await?;
        }
        ItemKind::FinishedGood => {
            let boxed_qty = breakdown.no_of_boxes * breakdown.qty_per_box;
            if boxed_qty > 0 {
                sqlx::query(
                    r#"
                    INSERT INTO product_fg_lots (product_id, lot_number, qty, is_loose, box_count)
                    VALUES ($1, $2, $3, false, $4)
                    "#,
                )
                .bind(po.item_id)
                .bind(lot_number)
                .bind(boxed_qty)
                .bind(breakdown.no_of_boxes)
                .execute(&mut **tx)
                .await?;
            }
            if breakdown.loose_qty > 0 {
                sqlx::query(
                    r#"
                    INSERT INTO product_fg_lots (product_id, lot_number, qty, is_loose, box_count)
                    VALUES ($1, $2 || '-LOOSE', $3, true, 0)
                    "#,
                )
                .bind(po.item_id)
                .bind(lot_number)
                .bind(breakdown.loose_qty)
                .execute(&mut **tx)
                .await?;
            }

            sqlx::query(
                "UPDATE products SET warehouse_qty = warehouse_qty + $1, updated_at = now() WHERE id = $2",
            )
            .bind(boxed_qty + breakdown.loose_qty)
            .bind(po.item_id)
            .execute(&mut **tx)
            .await?;
        }
    }

    sqlx::query(
        "UPDATE vendors SET balance = balance + $1, updated_at = now() WHERE id = $2",
    )
    .bind(net_value)
    .bind(po.vendor_id)
    .execute(&mut **tx)
    .await?;

    let received_before = po.qty_received;
    let received_after = received_before + qty;

    // Only the portion of this receipt that pushes the running total past
    // the ordered quantity is surplus
    let surplus = (received_after - po.qty_ordered.max(received_before)).max(Decimal::ZERO);
    if surplus > Decimal::ZERO {
        sqlx::query(
            r#"
            INSERT INTO surplus_ledger (po_id, po_number, item_kind, item_id, item_name, lot_number, surplus_qty, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(po.id)
        .bind(&po.po_number)
        .bind(&po.item_kind)
        .bind(po.item_id)
        .bind(&po.item_name)
        .bind(lot_number)
        .bind(surplus)
        .bind(actor)
        .execute(&mut **tx)
        .await?;

        tracing::info!(po = %po.po_number, %surplus, "Over-receipt recorded in surplus ledger");
    }

    let new_status = if received_after >= po.qty_ordered {
        PoStatus::Completed
    } else {
        PoStatus::Partial
    };
    sqlx::query(
        r#"
        UPDATE purchase_orders
        SET qty_received = $1, status = $2, updated_at = now()
        WHERE id = $3
        "#,
    )
    .bind(received_after)
    .bind(new_status.as_str())
    .bind(po.id)
    .execute(&mut **tx)
    .await?;

    // A completed full-buy order finishes its job
    if new_status == PoStatus::Completed {
        if let Some(job_id) = po.job_id {
            sqlx::query(
                "UPDATE jobs SET current_step = $1, status = $2, updated_at = now() WHERE id = $3",
            )
            .bind(JobStep::QcCompleted.as_str())
            .bind(JobStatus::Completed.as_str())
            .bind(job_id)
            .execute(&mut **tx)
            .await?;
            append_history_tx(
                tx,
                job_id,
                JobStep::QcCompleted.as_str(),
                JobStatus::Completed.as_str(),
                Some("Full-buy order received in full"),
                actor,
            )
            .await?;
        }
    }

    // New finished stock goes straight through the allocation waterfall
    if kind == ItemKind::FinishedGood {
        run_waterfall_tx(tx, po.item_id, actor).await?;
    }

    Ok(())
}
