//! Vendor registry and payable balances

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::VendorCategory;

/// Vendor service
#[derive(Clone)]
pub struct VendorService {
    db: PgPool,
}

/// Vendor master record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VendorRecord {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gst_number: Option<String>,
    pub balance: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a vendor
#[derive(Debug, Deserialize)]
pub struct CreateVendorInput {
    pub name: String,
    pub category: VendorCategory,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gst_number: Option<String>,
}

const VENDOR_COLUMNS: &str = "id, name, category, contact_person, phone, email, gst_number, \
     balance, active, created_at, updated_at";

impl VendorService {
    /// Create a new VendorService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a vendor
    pub async fn create_vendor(&self, input: CreateVendorInput) -> AppResult<VendorRecord> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Vendor name is required".to_string(),
            });
        }
        if let Some(email) = &input.email {
            shared::validate_email(email).map_err(|msg| AppError::Validation {
                field: "email".to_string(),
                message: msg.to_string(),
            })?;
        }

        let vendor = sqlx::query_as::<_, VendorRecord>(&format!(
            r#"
            INSERT INTO vendors (name, category, contact_person, phone, email, gst_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {VENDOR_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(input.category.as_str())
        .bind(input.contact_person)
        .bind(input.phone)
        .bind(input.email)
        .bind(input.gst_number)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(vendor = %vendor.name, category = %vendor.category, "Vendor registered");
        Ok(vendor)
    }

    /// List vendors, optionally by category
    pub async fn list_vendors(
        &self,
        category: Option<VendorCategory>,
    ) -> AppResult<Vec<VendorRecord>> {
        let vendors = sqlx::query_as::<_, VendorRecord>(&format!(
            r#"
            SELECT {VENDOR_COLUMNS} FROM vendors
            WHERE active = true AND ($1::text IS NULL OR category = $1)
            ORDER BY name
            "#
        ))
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.db)
        .await?;

        Ok(vendors)
    }

    /// Get one vendor with its running payable balance
    pub async fn get_vendor(&self, vendor_id: Uuid) -> AppResult<VendorRecord> {
        sqlx::query_as::<_, VendorRecord>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1"
        ))
        .bind(vendor_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor".to_string()))
    }
}
