//! Middleware for the Garment Production Fulfillment Platform

mod auth;

pub use auth::{auth_middleware, require_role, vendor_scope, AuthUser, CurrentUser};
