//! Inventory service: material and product masters, the FIFO lot ledger and
//! read-time stock health

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::orders::run_waterfall_tx;
use shared::{
    classify_health, issue_fifo, reorder_target, short_ref, validate_lot_number,
    validate_measured_qty, validate_piece_qty, validate_receipt_breakdown, validate_sku,
    FinishedLot, HealthStatus, LotDraw, MaterialType, ReceiptBreakdown, SemiFinishedLot, StockLot,
};

/// Inventory service for masters, lots and stock views
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Material master record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MaterialRecord {
    pub id: Uuid,
    pub material_code: String,
    pub name: String,
    pub material_type: String,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub avg_daily_consumption: Decimal,
    pub lead_time_days: i32,
    pub safety_multiplier: Decimal,
    pub current_qty: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Material master with health computed at read time
#[derive(Debug, Clone, Serialize)]
pub struct MaterialStockView {
    #[serde(flatten)]
    pub material: MaterialRecord,
    pub reorder_target: Decimal,
    pub health: HealthStatus,
    pub lots: Vec<StockLot>,
}

/// Input for registering a material
#[derive(Debug, Deserialize)]
pub struct CreateMaterialInput {
    pub material_code: String,
    pub name: String,
    pub material_type: MaterialType,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub avg_daily_consumption: Decimal,
    pub lead_time_days: i32,
    pub safety_multiplier: Decimal,
    /// Opening stock booked as the material's first lot
    pub opening_stock: Option<ReceiveLotInput>,
}

/// Input for updating a material's planning metrics
#[derive(Debug, Deserialize)]
pub struct UpdateMaterialInput {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub cost_per_unit: Option<Decimal>,
    pub avg_daily_consumption: Option<Decimal>,
    pub lead_time_days: Option<i32>,
    pub safety_multiplier: Option<Decimal>,
}

/// Input for booking opening stock or a manual adjustment lot
#[derive(Debug, Deserialize)]
pub struct ReceiveLotInput {
    pub lot_number: String,
    pub qty: Decimal,
}

/// Input for booking finished goods straight into the warehouse, outside
/// the purchasing flow
#[derive(Debug, Deserialize)]
pub struct ReceiveFinishedInput {
    pub lot_number: Option<String>,
    pub qty: i32,
    pub breakdown: Option<ReceiptBreakdown>,
}

/// Product master record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductRecord {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub fabric_type: Option<String>,
    pub cost_per_unit: Decimal,
    pub selling_price: Decimal,
    pub avg_daily_consumption: Decimal,
    pub lead_time_days: i32,
    pub safety_multiplier: Decimal,
    pub warehouse_qty: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product with pools and health computed at read time
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockView {
    #[serde(flatten)]
    pub product: ProductRecord,
    pub reorder_target: Decimal,
    pub health: HealthStatus,
    pub finished_lots: Vec<FinishedLot>,
    pub semi_finished_lots: Vec<SemiFinishedLot>,
    pub semi_finished_qty: i32,
}

/// Input for registering a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub fabric_type: Option<String>,
    pub cost_per_unit: Decimal,
    pub selling_price: Decimal,
    pub avg_daily_consumption: Decimal,
    pub lead_time_days: i32,
    pub safety_multiplier: Decimal,
    pub bom: Vec<BomLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct BomLineInput {
    pub material_id: Uuid,
    pub qty_per_piece: Decimal,
}

/// One resolved bill-of-materials line
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BomLineRecord {
    pub material_id: Uuid,
    pub material_name: String,
    pub qty_per_piece: Decimal,
}

#[derive(Debug, FromRow)]
struct MaterialLotRow {
    id: Uuid,
    lot_number: String,
    qty: Decimal,
    added_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct FinishedLotRow {
    lot_number: String,
    qty: i32,
    is_loose: bool,
    box_count: i32,
    inspector: Option<String>,
    added_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SemiFinishedLotRow {
    lot_number: String,
    qty: i32,
    job_number: String,
    added_at: DateTime<Utc>,
}

const MATERIAL_COLUMNS: &str = "id, material_code, name, material_type, unit, cost_per_unit, \
     avg_daily_consumption, lead_time_days, safety_multiplier, current_qty, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, sku, name, category, sub_category, fabric_type, cost_per_unit, \
     selling_price, avg_daily_consumption, lead_time_days, safety_multiplier, warehouse_qty, \
     created_at, updated_at";

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a material master
    pub async fn create_material(&self, input: CreateMaterialInput) -> AppResult<MaterialRecord> {
        validate_sku(&input.material_code).map_err(|msg| AppError::Validation {
            field: "material_code".to_string(),
            message: msg.to_string(),
        })?;
        if input.lead_time_days < 0 {
            return Err(AppError::Validation {
                field: "lead_time_days".to_string(),
                message: "Lead time cannot be negative".to_string(),
            });
        }

        if let Some(opening) = &input.opening_stock {
            validate_measured_qty(opening.qty).map_err(|msg| AppError::Validation {
                field: "opening_stock.qty".to_string(),
                message: msg.to_string(),
            })?;
            validate_lot_number(&opening.lot_number).map_err(|msg| AppError::Validation {
                field: "opening_stock.lot_number".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let material = sqlx::query_as::<_, MaterialRecord>(&format!(
            r#"
            INSERT INTO materials (
                material_code, name, material_type, unit, cost_per_unit,
                avg_daily_consumption, lead_time_days, safety_multiplier
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MATERIAL_COLUMNS}
            "#
        ))
        .bind(&input.material_code)
        .bind(&input.name)
        .bind(input.material_type.as_str())
        .bind(&input.unit)
        .bind(input.cost_per_unit)
        .bind(input.avg_daily_consumption)
        .bind(input.lead_time_days)
        .bind(input.safety_multiplier)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(opening) = &input.opening_stock {
            receive_material_lot_tx(&mut tx, material.id, &opening.lot_number, opening.qty)
                .await?;
        }

        tx.commit().await?;
        Ok(material)
    }

    /// Update a material's planning metrics. Omitted fields keep their
    /// current values.
    pub async fn update_material(
        &self,
        material_id: Uuid,
        input: UpdateMaterialInput,
    ) -> AppResult<MaterialStockView> {
        if matches!(input.lead_time_days, Some(days) if days < 0) {
            return Err(AppError::Validation {
                field: "lead_time_days".to_string(),
                message: "Lead time cannot be negative".to_string(),
            });
        }

        let updated = sqlx::query(
            r#"
            UPDATE materials
            SET name = COALESCE($1, name),
                unit = COALESCE($2, unit),
                cost_per_unit = COALESCE($3, cost_per_unit),
                avg_daily_consumption = COALESCE($4, avg_daily_consumption),
                lead_time_days = COALESCE($5, lead_time_days),
                safety_multiplier = COALESCE($6, safety_multiplier),
                updated_at = now()
            WHERE id = $7
            "#,
        )
        .bind(&input.name)
        .bind(&input.unit)
        .bind(input.cost_per_unit)
        .bind(input.avg_daily_consumption)
        .bind(input.lead_time_days)
        .bind(input.safety_multiplier)
        .bind(material_id)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Material".to_string()));
        }

        self.get_material(material_id).await
    }

    /// List materials with lots and health, computed from current figures
    pub async fn list_materials(&self) -> AppResult<Vec<MaterialStockView>> {
        let materials = sqlx::query_as::<_, MaterialRecord>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials ORDER BY material_code"
        ))
        .fetch_all(&self.db)
        .await?;

        let mut views = Vec::with_capacity(materials.len());
        for material in materials {
            let lots = self.material_lots(material.id).await?;
            views.push(Self::material_view(material, lots));
        }
        Ok(views)
    }

    /// Get one material with lots and health
    pub async fn get_material(&self, material_id: Uuid) -> AppResult<MaterialStockView> {
        let material = sqlx::query_as::<_, MaterialRecord>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = $1"
        ))
        .bind(material_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        let lots = self.material_lots(material_id).await?;
        Ok(Self::material_view(material, lots))
    }

    /// Book a material lot outside the purchasing flow (opening stock,
    /// stock-take adjustment)
    pub async fn receive_material_lot(
        &self,
        material_id: Uuid,
        input: ReceiveLotInput,
    ) -> AppResult<MaterialStockView> {
        validate_measured_qty(input.qty).map_err(|msg| AppError::Validation {
            field: "qty".to_string(),
            message: msg.to_string(),
        })?;
        validate_lot_number(&input.lot_number).map_err(|msg| AppError::Validation {
            field: "lot_number".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;
        receive_material_lot_tx(&mut tx, material_id, &input.lot_number, input.qty).await?;
        tx.commit().await?;

        self.get_material(material_id).await
    }

    /// Book finished goods straight into the warehouse and rerun the
    /// allocation waterfall, so queued orders pick the stock up immediately
    pub async fn receive_finished_lot(
        &self,
        product_id: Uuid,
        input: ReceiveFinishedInput,
        actor: &str,
    ) -> AppResult<ProductStockView> {
        validate_piece_qty(input.qty).map_err(|msg| AppError::Validation {
            field: "qty".to_string(),
            message: msg.to_string(),
        })?;
        if let Some(lot) = &input.lot_number {
            validate_lot_number(lot).map_err(|msg| AppError::Validation {
                field: "lot_number".to_string(),
                message: msg.to_string(),
            })?;
        }
        let breakdown = match input.breakdown {
            Some(breakdown) => {
                validate_receipt_breakdown(
                    input.qty,
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
            None => ReceiptBreakdown {
                no_of_boxes: 0,
                qty_per_box: 0,
                loose_qty: input.qty,
            },
        };

        let lot_number = input
            .lot_number
            .unwrap_or_else(|| format!("LOT-{}", short_ref()));

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            "UPDATE products SET warehouse_qty = warehouse_qty + $1, updated_at = now() WHERE id = $2",
        )
        .bind(input.qty)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let boxed_qty = breakdown.no_of_boxes * breakdown.qty_per_box;
        if boxed_qty > 0 {
            sqlx::query(
                r#"
                INSERT INTO product_fg_lots (product_id, lot_number, qty, is_loose, box_count)
                VALUES ($1, $2, $3, false, $4)
                "#,
            )
            .bind(product_id)
            .bind(&lot_number)
            .bind(boxed_qty)
            .bind(breakdown.no_of_boxes)
            .execute(&mut *tx)
            .await?;
        }
        if breakdown.loose_qty > 0 {
            sqlx::query(
                r#"
                INSERT INTO product_fg_lots (product_id, lot_number, qty, is_loose, box_count)
                VALUES ($1, $2 || '-LOOSE', $3, true, 0)
                "#,
            )
            .bind(product_id)
            .bind(&lot_number)
            .bind(breakdown.loose_qty)
            .execute(&mut *tx)
            .await?;
        }

        run_waterfall_tx(&mut tx, product_id, actor).await?;
        tx.commit().await?;

        self.get_product(product_id).await
    }

    /// Register a product master with its bill of materials
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<ProductRecord> {
        validate_sku(&input.sku).map_err(|msg| AppError::Validation {
            field: "sku".to_string(),
            message: msg.to_string(),
        })?;
        for line in &input.bom {
            validate_measured_qty(line.qty_per_piece).map_err(|msg| AppError::Validation {
                field: "bom.qty_per_piece".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, ProductRecord>(&format!(
            r#"
            INSERT INTO products (
                sku, name, category, sub_category, fabric_type, cost_per_unit,
                selling_price, avg_daily_consumption, lead_time_days, safety_multiplier
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.sub_category)
        .bind(&input.fabric_type)
        .bind(input.cost_per_unit)
        .bind(input.selling_price)
        .bind(input.avg_daily_consumption)
        .bind(input.lead_time_days)
        .bind(input.safety_multiplier)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.bom {
            let inserted = sqlx::query(
                r#"
                INSERT INTO bom_lines (product_id, material_id, qty_per_piece)
                SELECT $1, id, $3 FROM materials WHERE id = $2
                "#,
            )
            .bind(product.id)
            .bind(line.material_id)
            .bind(line.qty_per_piece)
            .execute(&mut *tx)
            .await?;

            if inserted.rows_affected() == 0 {
                return Err(AppError::NotFound("Material".to_string()));
            }
        }

        tx.commit().await?;
        Ok(product)
    }

    /// List products with pools and health, computed from current figures
    pub async fn list_products(&self) -> AppResult<Vec<ProductStockView>> {
        let products = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sku"
        ))
        .fetch_all(&self.db)
        .await?;

        let mut views = Vec::with_capacity(products.len());
        for product in products {
            views.push(self.product_view(product).await?);
        }
        Ok(views)
    }

    /// Get one product with pools and health
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<ProductStockView> {
        let product = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        self.product_view(product).await
    }

    /// Bill of materials for a product
    pub async fn get_bom(&self, product_id: Uuid) -> AppResult<Vec<BomLineRecord>> {
        let lines = sqlx::query_as::<_, BomLineRecord>(
            r#"
            SELECT b.material_id, m.name AS material_name, b.qty_per_piece
            FROM bom_lines b
            JOIN materials m ON m.id = b.material_id
            WHERE b.product_id = $1
            ORDER BY m.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lines)
    }

    async fn material_lots(&self, material_id: Uuid) -> AppResult<Vec<StockLot>> {
        let rows = sqlx::query_as::<_, MaterialLotRow>(
            r#"
            SELECT id, lot_number, qty, added_at
            FROM material_lots
            WHERE material_id = $1 AND qty > 0
            ORDER BY added_at
            "#,
        )
        .bind(material_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StockLot {
                lot_number: r.lot_number,
                qty: r.qty,
                added_at: r.added_at,
            })
            .collect())
    }

    fn material_view(material: MaterialRecord, lots: Vec<StockLot>) -> MaterialStockView {
        let target = reorder_target(
            material.avg_daily_consumption,
            material.lead_time_days,
            material.safety_multiplier,
        );
        let health = classify_health(material.current_qty, target);
        MaterialStockView {
            material,
            reorder_target: target,
            health,
            lots,
        }
    }

    async fn product_view(&self, product: ProductRecord) -> AppResult<ProductStockView> {
        let finished = sqlx::query_as::<_, FinishedLotRow>(
            r#"
            SELECT lot_number, qty, is_loose, box_count, inspector, added_at
            FROM product_fg_lots
            WHERE product_id = $1 AND qty > 0
            ORDER BY added_at
            "#,
        )
        .bind(product.id)
        .fetch_all(&self.db)
        .await?;

        let semi = sqlx::query_as::<_, SemiFinishedLotRow>(
            r#"
            SELECT lot_number, qty, job_number, added_at
            FROM product_sfg_lots
            WHERE product_id = $1 AND qty > 0
            ORDER BY added_at
            "#,
        )
        .bind(product.id)
        .fetch_all(&self.db)
        .await?;

        let target = reorder_target(
            product.avg_daily_consumption,
            product.lead_time_days,
            product.safety_multiplier,
        );
        let health = classify_health(Decimal::from(product.warehouse_qty), target);
        let semi_finished_lots: Vec<SemiFinishedLot> = semi
            .into_iter()
            .map(|r| SemiFinishedLot {
                lot_number: r.lot_number,
                qty: r.qty,
                job_id: r.job_number,
                added_at: r.added_at,
            })
            .collect();
        let semi_finished_qty = semi_finished_lots.iter().map(|l| l.qty).sum();

        Ok(ProductStockView {
            product,
            reorder_target: target,
            health,
            finished_lots: finished
                .into_iter()
                .map(|r| FinishedLot {
                    lot_number: r.lot_number,
                    qty: r.qty,
                    is_loose: r.is_loose,
                    box_count: r.box_count,
                    inspector: r.inspector,
                    added_at: r.added_at,
                })
                .collect(),
            semi_finished_lots,
            semi_finished_qty,
        })
    }
}

/// Issue a quantity of a material oldest-lot-first inside a transaction.
///
/// Locks the material row, drains lots through the shared FIFO rule, writes
/// the surviving lot quantities back and decrements the running total.
/// Returns the per-lot breakdown for the issuance log.
pub async fn issue_material_fifo_tx(
    tx: &mut Transaction<'_, Postgres>,
    material_id: Uuid,
    qty: Decimal,
) -> AppResult<Vec<LotDraw>> {
    let material = sqlx::query_as::<_, (String, Decimal)>(
        "SELECT name, current_qty FROM materials WHERE id = $1 FOR UPDATE",
    )
    .bind(material_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

    let rows = sqlx::query_as::<_, MaterialLotRow>(
        r#"
        SELECT id, lot_number, qty, added_at
        FROM material_lots
        WHERE material_id = $1 AND qty > 0
        ORDER BY added_at, id
        FOR UPDATE
        "#,
    )
    .bind(material_id)
    .fetch_all(&mut **tx)
    .await?;

    let mut lots: Vec<StockLot> = rows
        .iter()
        .map(|r| StockLot {
            lot_number: r.lot_number.clone(),
            qty: r.qty,
            added_at: r.added_at,
        })
        .collect();

    let draws = issue_fifo(&mut lots, qty).map_err(|err| match err {
        shared::LedgerError::InsufficientStock {
            requested,
            available,
        } => AppError::InsufficientStock(format!(
            "{}: requested {}, available {}",
            material.0, requested, available
        )),
        other => AppError::from(other),
    })?;

    // Draws come back oldest-first, one per lot touched, so they pair off
    // positionally with the locked rows. Lot numbers may repeat within a
    // material and cannot key the write-back.
    for (row, draw) in rows.iter().zip(&draws) {
        if draw.qty_taken == row.qty {
            sqlx::query("DELETE FROM material_lots WHERE id = $1")
                .bind(row.id)
                .execute(&mut **tx)
                .await?;
        } else {
            sqlx::query("UPDATE material_lots SET qty = qty - $1 WHERE id = $2")
                .bind(draw.qty_taken)
                .bind(row.id)
                .execute(&mut **tx)
                .await?;
        }
    }

    sqlx::query(
        "UPDATE materials SET current_qty = current_qty - $1, updated_at = now() WHERE id = $2",
    )
    .bind(qty)
    .bind(material_id)
    .execute(&mut **tx)
    .await?;

    Ok(draws)
}

/// Add a material lot and bump the running total inside a transaction
pub async fn receive_material_lot_tx(
    tx: &mut Transaction<'_, Postgres>,
    material_id: Uuid,
    lot_number: &str,
    qty: Decimal,
) -> AppResult<()> {
    let updated = sqlx::query(
        "UPDATE materials SET current_qty = current_qty + $1, updated_at = now() WHERE id = $2",
    )
    .bind(qty)
    .bind(material_id)
    .execute(&mut **tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Material".to_string()));
    }

    sqlx::query("INSERT INTO material_lots (material_id, lot_number, qty) VALUES ($1, $2, $3)")
        .bind(material_id)
        .bind(lot_number)
        .bind(qty)
        .execute(&mut **tx)
        .await?;

    Ok(())
}
