//! Purchase order models, receipt arithmetic and the surplus ledger

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Purchase order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoStatus {
    Pending,
    /// Some quantity received, more inbound
    Partial,
    Completed,
    /// Receipt held back by an incoming-QC failure
    QcReview,
    Rejected,
}

impl PoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoStatus::Pending => "Pending",
            PoStatus::Partial => "Partial",
            PoStatus::Completed => "Completed",
            PoStatus::QcReview => "QC_Review",
            PoStatus::Rejected => "Rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(PoStatus::Pending),
            "Partial" => Some(PoStatus::Partial),
            "Completed" => Some(PoStatus::Completed),
            "QC_Review" => Some(PoStatus::QcReview),
            "Rejected" => Some(PoStatus::Rejected),
            _ => None,
        }
    }
}

/// What a purchase order line buys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    RawMaterial,
    FinishedGood,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::RawMaterial => "Raw Material",
            ItemKind::FinishedGood => "Finished Good",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Raw Material" => Some(ItemKind::RawMaterial),
            "Finished Good" => Some(ItemKind::FinishedGood),
            _ => None,
        }
    }
}

/// Physical packaging breakdown declared on a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptBreakdown {
    pub no_of_boxes: i32,
    pub qty_per_box: i32,
    pub loose_qty: i32,
}

impl ReceiptBreakdown {
    pub fn total(&self) -> i32 {
        self.no_of_boxes * self.qty_per_box + self.loose_qty
    }
}

/// Net value of a receipt line: gross less the discount, plus GST on the
/// discounted base. Accrues to the vendor's payable balance.
pub fn net_receipt_value(
    qty: Decimal,
    unit_price: Decimal,
    discount_percent: Decimal,
    gst_percent: Decimal,
) -> Decimal {
    let hundred = Decimal::from(100);
    let gross = qty * unit_price;
    let discounted = gross * (Decimal::ONE - discount_percent / hundred);
    discounted * (Decimal::ONE + gst_percent / hundred)
}

/// Quantity received beyond what the order asked for
pub fn surplus_over(ordered: Decimal, received_total: Decimal) -> Decimal {
    (received_total - ordered).max(Decimal::ZERO)
}

/// How much of a surplus entry is still attributable to its lot. The lot
/// drains through normal FIFO consumption, so the live surplus can never
/// exceed what is left in the lot.
pub fn remaining_surplus(surplus_added: Decimal, current_lot_qty: Decimal) -> Decimal {
    surplus_added.min(current_lot_qty).max(Decimal::ZERO)
}
