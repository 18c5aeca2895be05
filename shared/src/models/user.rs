//! User and role models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    /// Store keeper; issues materials and books receipts
    Store,
    /// QC inspector
    Inspector,
    /// External vendor user; sees only jobs routed to their company
    Vendor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Store => "Store",
            Role::Inspector => "Inspector",
            Role::Vendor => "Vendor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Admin" => Some(Role::Admin),
            "Manager" => Some(Role::Manager),
            "Store" => Some(Role::Store),
            "Inspector" => Some(Role::Inspector),
            "Vendor" => Some(Role::Vendor),
            _ => None,
        }
    }
}

/// The authenticated actor attached to every mutating operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
    /// Set for vendor users; scopes their reads to their own jobs
    pub vendor_id: Option<Uuid>,
}

impl Actor {
    pub fn is_vendor(&self) -> bool {
        self.role == Role::Vendor
    }
}
