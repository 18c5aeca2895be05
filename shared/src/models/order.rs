//! Sales order models and the allocation waterfall

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order priority; the waterfall serves higher weights first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn weight(&self) -> i32 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Priority::Low),
            "Medium" => Some(Priority::Medium),
            "High" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Sales order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    /// Some demand is waiting on production
    ProductionQueued,
    /// Fully covered by allocated warehouse stock
    ReadyDispatch,
    PartiallyDispatched,
    Dispatched,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::ProductionQueued => "Production_Queued",
            OrderStatus::ReadyDispatch => "Ready_Dispatch",
            OrderStatus::PartiallyDispatched => "Partially_Dispatched",
            OrderStatus::Dispatched => "Dispatched",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "Production_Queued" => Some(OrderStatus::ProductionQueued),
            "Ready_Dispatch" => Some(OrderStatus::ReadyDispatch),
            "Partially_Dispatched" => Some(OrderStatus::PartiallyDispatched),
            "Dispatched" => Some(OrderStatus::Dispatched),
            _ => None,
        }
    }
}

/// One order line for a product, as the waterfall sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub order_item_id: Uuid,
    pub priority: Priority,
    pub order_created_at: DateTime<Utc>,
    pub qty_ordered: i32,
    pub qty_dispatched: i32,
    /// Pieces reserved from the warehouse for this line
    pub qty_allocated: i32,
    /// Pieces this line is waiting on production for
    pub qty_to_produce: i32,
}

impl AllocationLine {
    /// Undispatched demand still to be covered
    pub fn need(&self) -> i32 {
        (self.qty_ordered - self.qty_dispatched).max(0)
    }

    pub fn fully_allocated(&self) -> bool {
        self.qty_allocated >= self.need()
    }
}

/// Pull every line's current allocation back into a single pool alongside
/// the free warehouse stock. Lines are zeroed; nothing is owned until the
/// waterfall runs again.
pub fn reclaim_pool(warehouse_qty: i32, lines: &mut [AllocationLine]) -> i32 {
    let mut pool = warehouse_qty.max(0);
    for line in lines.iter_mut() {
        pool += line.qty_allocated;
        line.qty_allocated = 0;
        line.qty_to_produce = 0;
    }
    pool
}

/// Rank lines for allocation: priority weight descending, then order
/// creation time ascending. A later high-priority order displaces an
/// earlier low-priority one because the whole pool is re-ranked.
pub fn rank_for_allocation(lines: &mut [AllocationLine]) {
    lines.sort_by(|a, b| {
        b.priority
            .weight()
            .cmp(&a.priority.weight())
            .then(a.order_created_at.cmp(&b.order_created_at))
    });
}

/// Run the greedy waterfall over ranked lines. Each line takes
/// `min(need, pool)`; the remainder of its need becomes its production
/// backlog. Returns the leftover pool to write back to the warehouse.
pub fn run_waterfall(mut pool: i32, lines: &mut [AllocationLine]) -> i32 {
    for line in lines.iter_mut() {
        let need = line.need();
        let take = need.min(pool);
        line.qty_allocated = take;
        line.qty_to_produce = need - take;
        pool -= take;
    }
    pool
}

/// Order status implied by its lines after a waterfall run
pub fn status_after_allocation(lines: &[AllocationLine]) -> OrderStatus {
    if lines.iter().all(|l| l.fully_allocated()) {
        OrderStatus::ReadyDispatch
    } else {
        OrderStatus::ProductionQueued
    }
}

/// Order status implied by dispatch progress across its lines
pub fn status_after_dispatch(lines: &[AllocationLine]) -> OrderStatus {
    if lines.iter().all(|l| l.qty_dispatched >= l.qty_ordered) {
        OrderStatus::Dispatched
    } else {
        OrderStatus::PartiallyDispatched
    }
}
