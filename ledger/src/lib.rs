//! Luxae Coupons Ledger Interface
//!
//! The token ledger is an external system of record. This crate describes
//! the capabilities the coupon service needs from it, the address validator
//! used on every caller-supplied address, and an in-process simulated ledger
//! for tests and local runs.

pub mod address;
pub mod client;
pub mod error;
pub mod offline;
pub mod simulated;
pub mod units;

pub use address::{AddressValidator, EvmAddressValidator};
pub use client::{LedgerClient, PendingTransfer, ReceiptStatus, TokenInfo, TransferReceipt};
pub use error::{LedgerError, LedgerResult};
pub use offline::OfflineLedger;
pub use simulated::SimulatedLedger;
pub use units::format_units;
