//! Vendor master models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a vendor can be engaged for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorCategory {
    /// Sells raw materials
    MaterialSupplier,
    /// Runs stitching on our cut panels
    JobWorker,
    /// Sells fully finished garments
    Trading,
}

impl VendorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorCategory::MaterialSupplier => "Material_Supplier",
            VendorCategory::JobWorker => "Job_Worker",
            VendorCategory::Trading => "Trading",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Material_Supplier" => Some(VendorCategory::MaterialSupplier),
            "Job_Worker" => Some(VendorCategory::JobWorker),
            "Trading" => Some(VendorCategory::Trading),
            _ => None,
        }
    }
}

/// Vendor master record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub category: VendorCategory,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gst_number: Option<String>,
    /// Outstanding payable, accrued on receipts
    pub balance: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
