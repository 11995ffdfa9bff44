//! Callback correlation subsystem.
//!
//! # Data Flow
//! ```text
//! create-transaction request                 callback request
//!     → id.rs (generate or accept id)            │
//!     → registry.register(id) ──┐                │
//!     → submit upstream         │ slot           │
//!     → handle.wait(deadline) ◀─┴── registry.deliver(id, status, payload)
//!     → handle.release() / drop (slot removed on every exit path)
//! ```
//!
//! # Design Decisions
//! - The registry is the only state shared between the two requests
//! - First delivery wins; later and unmatched deliveries are no-ops
//! - Single-process only; nothing is persisted

pub mod id;
pub mod registry;

pub use id::{CorrelationIdGenerator, TimestampIdGenerator};
pub use registry::{Delivery, PendingRegistry, RegistryError, SlotHandle, WaitOutcome};
