//! Domain models for the Garment Production Fulfillment Platform

mod job;
mod material;
mod order;
mod plan;
mod product;
mod purchase;
mod quality;
mod user;
mod vendor;

pub use job::*;
pub use material::*;
pub use order::*;
pub use plan::*;
pub use product::*;
pub use purchase::*;
pub use quality::*;
pub use user::*;
pub use vendor::*;
