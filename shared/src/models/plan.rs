//! Production plan models and planning arithmetic

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::Routing;
use super::material::refill_to_target;

/// Lifecycle of a production plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Created by the allocation waterfall, awaiting a sourcing strategy
    PendingStrategy,
    /// Strategy confirmed for part of the required quantity
    PartiallyPlanned,
    /// Strategy confirmed for the full required quantity
    Scheduled,
    InProgress,
    Completed,
    /// Demand was covered from the warehouse; nothing to produce
    FulfilledByStock,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::PendingStrategy => "Pending_Strategy",
            PlanStatus::PartiallyPlanned => "Partially_Planned",
            PlanStatus::Scheduled => "Scheduled",
            PlanStatus::InProgress => "In_Progress",
            PlanStatus::Completed => "Completed",
            PlanStatus::FulfilledByStock => "Fulfilled_By_Stock",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending_Strategy" => Some(PlanStatus::PendingStrategy),
            "Partially_Planned" => Some(PlanStatus::PartiallyPlanned),
            "Scheduled" => Some(PlanStatus::Scheduled),
            "In_Progress" => Some(PlanStatus::InProgress),
            "Completed" => Some(PlanStatus::Completed),
            "Fulfilled_By_Stock" => Some(PlanStatus::FulfilledByStock),
            _ => None,
        }
    }
}

/// Sourcing mode for one split of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Make in house or at a job-work vendor, per the split's routing
    Manufacturing,
    /// Buy finished from a trading vendor
    FullBuy,
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Manufacturing => "Manufacturing",
            SplitMode::FullBuy => "Full-Buy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Manufacturing" => Some(SplitMode::Manufacturing),
            "Full-Buy" => Some(SplitMode::FullBuy),
            _ => None,
        }
    }
}

/// One confirmed split of a plan's quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRecord {
    pub qty: i32,
    pub mode: SplitMode,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub unit_cost: Decimal,
    /// Stage routing for manufacturing splits
    pub routing: Option<Routing>,
    /// Job card spawned for this split
    pub job_id: String,
    pub created_at: DateTime<Utc>,
}

/// Ceiling on the quantity a strategy confirmation may commit.
///
/// Covers the order-driven shortfall plus an opportunistic refill of the
/// warehouse up to its reorder target. Confirming beyond the ceiling is an
/// over-commit and must be refused.
pub fn allocation_ceiling(
    qty_to_produce: i32,
    already_planned: i32,
    already_dispatched: i32,
    reorder_target: Decimal,
    warehouse_qty: i32,
) -> i32 {
    let shortfall = (qty_to_produce - already_planned - already_dispatched).max(0);
    shortfall + refill_to_target(reorder_target, warehouse_qty)
}

/// Status a plan settles into after a confirmation commits `planned` of the
/// `required` order-driven quantity
pub fn status_after_confirmation(planned: i32, required: i32) -> PlanStatus {
    if planned >= required {
        PlanStatus::Scheduled
    } else {
        PlanStatus::PartiallyPlanned
    }
}
