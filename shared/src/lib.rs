//! Shared types and domain rules for the Garment Production Fulfillment Platform
//!
//! This crate contains the entity models and the pure domain logic (FIFO lot
//! issuance, stock-health banding, the job transition table, QC gate
//! evaluation and the allocation waterfall) shared between the backend
//! services and their tests.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
