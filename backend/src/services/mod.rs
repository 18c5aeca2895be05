//! Business logic services for the Production Fulfillment Platform

pub mod inventory;
pub mod job;
pub mod orders;
pub mod production;
pub mod purchasing;
pub mod quality;
pub mod vendor;

pub use inventory::InventoryService;
pub use job::JobService;
pub use orders::OrderService;
pub use production::ProductionService;
pub use purchasing::PurchasingService;
pub use quality::QualityService;
pub use vendor::VendorService;
