//! Finished product models: BOM, finished and semi-finished lot pools

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::material::{classify_health, reorder_target, HealthStatus};

/// Sellable product (style + color + size grouping)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub fabric_type: Option<String>,
    pub cost_per_unit: Decimal,
    pub selling_price: Decimal,
    /// Average daily sell-through used for reorder planning
    pub avg_daily_consumption: Decimal,
    pub lead_time_days: i32,
    pub safety_multiplier: Decimal,
    /// Sellable finished-goods pieces on hand
    pub warehouse_qty: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn reorder_target(&self) -> Decimal {
        reorder_target(
            self.avg_daily_consumption,
            self.lead_time_days,
            self.safety_multiplier,
        )
    }

    pub fn health(&self) -> HealthStatus {
        classify_health(Decimal::from(self.warehouse_qty), self.reorder_target())
    }
}

/// One bill-of-materials line: material consumed per piece produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub material_id: Uuid,
    pub material_name: String,
    /// Quantity of the material per finished piece, in the material's unit
    pub qty_per_piece: Decimal,
}

/// Finished-goods lot inside a product's sellable pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishedLot {
    pub lot_number: String,
    pub qty: i32,
    /// Loose pieces outside box packaging
    pub is_loose: bool,
    pub box_count: i32,
    pub inspector: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Semi-finished lot: assembled pieces held between the two quality gates.
/// Not sellable until final QC moves them into the finished pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemiFinishedLot {
    pub lot_number: String,
    pub qty: i32,
    /// Job that produced the lot
    pub job_id: String,
    pub added_at: DateTime<Utc>,
}
