//! Raw material models and the FIFO lot ledger

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad material categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    Fabric,
    Trim,
    Accessory,
    Packaging,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Fabric => "Fabric",
            MaterialType::Trim => "Trim",
            MaterialType::Accessory => "Accessory",
            MaterialType::Packaging => "Packaging",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Fabric" => Some(MaterialType::Fabric),
            "Trim" => Some(MaterialType::Trim),
            "Accessory" => Some(MaterialType::Accessory),
            "Packaging" => Some(MaterialType::Packaging),
            _ => None,
        }
    }
}

/// A dated sub-unit of an item's stock, consumed oldest-first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLot {
    pub lot_number: String,
    pub qty: Decimal,
    pub added_at: DateTime<Utc>,
}

/// One line of the picking breakdown produced by a FIFO issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotDraw {
    pub lot_number: String,
    pub qty_taken: Decimal,
}

/// Errors from lot-ledger operations
#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },
    #[error("issue quantity must be greater than zero")]
    NonPositiveQty,
}

/// Total quantity across a set of lots
pub fn total_lot_qty(lots: &[StockLot]) -> Decimal {
    lots.iter().map(|l| l.qty).sum()
}

/// Consume `qty` from `lots` oldest-first.
///
/// Lots are drained in `added_at` order; a lot in the middle of the run may
/// be taken partially, and emptied lots are removed. Fails without touching
/// the lots when the total on hand cannot cover the request.
pub fn issue_fifo(lots: &mut Vec<StockLot>, qty: Decimal) -> Result<Vec<LotDraw>, LedgerError> {
    if qty <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveQty);
    }
    let available = total_lot_qty(lots);
    if available < qty {
        return Err(LedgerError::InsufficientStock {
            requested: qty,
            available,
        });
    }

    lots.sort_by(|a, b| a.added_at.cmp(&b.added_at));

    let mut remaining = qty;
    let mut draws = Vec::new();
    for lot in lots.iter_mut() {
        if remaining == Decimal::ZERO {
            break;
        }
        let take = lot.qty.min(remaining);
        lot.qty -= take;
        remaining -= take;
        draws.push(LotDraw {
            lot_number: lot.lot_number.clone(),
            qty_taken: take,
        });
    }
    lots.retain(|l| l.qty > Decimal::ZERO);

    Ok(draws)
}

/// Inventory health band, the ratio of current stock to the reorder target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    /// At or below 33% of the reorder target
    Critical,
    /// Above 33% and at or below 66%
    Medium,
    /// Above 66% and at or below 100%
    Optimal,
    /// Above the reorder target
    Excess,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Critical => "CRITICAL",
            HealthStatus::Medium => "MEDIUM",
            HealthStatus::Optimal => "OPTIMAL",
            HealthStatus::Excess => "EXCESS",
        }
    }
}

/// Reorder target: average daily consumption over the lead time, scaled by
/// the safety-stock multiplier. A multiplier below 1 counts as 1 so a
/// missing or zero setting never erases the baseline target.
pub fn reorder_target(
    avg_daily_consumption: Decimal,
    lead_time_days: i32,
    safety_multiplier: Decimal,
) -> Decimal {
    let multiplier = safety_multiplier.max(Decimal::ONE);
    avg_daily_consumption * Decimal::from(lead_time_days.max(0)) * multiplier
}

/// Classify stock health from the current quantity and the reorder target.
/// Always computed from current figures, never persisted.
pub fn classify_health(current_qty: Decimal, target: Decimal) -> HealthStatus {
    let target = if target > Decimal::ZERO {
        target
    } else {
        Decimal::ONE
    };
    let percent = current_qty / target * Decimal::from(100);
    if percent <= Decimal::from(33) {
        HealthStatus::Critical
    } else if percent <= Decimal::from(66) {
        HealthStatus::Medium
    } else if percent <= Decimal::from(100) {
        HealthStatus::Optimal
    } else {
        HealthStatus::Excess
    }
}

/// Whole-piece refill needed to bring a warehouse up to its reorder target
pub fn refill_to_target(target: Decimal, warehouse_qty: i32) -> i32 {
    let gap = target - Decimal::from(warehouse_qty);
    if gap <= Decimal::ZERO {
        return 0;
    }
    gap.ceil().to_i32().unwrap_or(i32::MAX)
}
