//! Luxae Coupons Common Types
//!
//! This crate contains shared types used across the coupon service,
//! including identifiers, token amounts, the coupon record with its status
//! machine, and the error taxonomy every component reports through.

pub mod amount;
pub mod coupon;
pub mod error;
pub mod identifiers;
pub mod time;

pub use amount::*;
pub use coupon::*;
pub use error::*;
pub use identifiers::*;
pub use time::*;
