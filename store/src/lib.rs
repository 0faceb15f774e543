//! Luxae Coupons Store
//!
//! Durable keyed collection of coupon records. Every mutation replaces the
//! whole snapshot, so writers must be serialized by the caller.

pub mod error;
pub mod json_file;
pub mod memory;
mod snapshot;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use store::CouponStore;
