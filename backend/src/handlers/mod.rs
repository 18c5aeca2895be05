//! HTTP handlers for the Production Fulfillment Platform

pub mod health;
pub mod inventory;
pub mod job;
pub mod orders;
pub mod production;
pub mod purchasing;
pub mod quality;
pub mod vendor;

pub use health::*;
pub use inventory::*;
pub use job::*;
pub use orders::*;
pub use production::*;
pub use purchasing::*;
pub use quality::*;
pub use vendor::*;
