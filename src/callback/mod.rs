//! Callback receiver subsystem.
//!
//! # Data Flow
//! ```text
//! PUT /mvola/callback (JSON)
//!     → receiver.rs (extract correlation id + status)
//!     → correlation::PendingRegistry::deliver (may wake a waiting request)
//!     → audit.rs (JSON line, matched or not)
//!     → always 200 to the gateway
//! ```

pub mod audit;
pub mod receiver;

pub use audit::{AuditRecord, CallbackAudit};
pub use receiver::{CallbackReceipt, CallbackReceiver};
