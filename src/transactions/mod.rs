//! Transaction orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! POST /mvola/transaction
//!     → types.rs (required fields, outbound payload)
//!     → orchestrator.rs (register → submit → wait → poll)
//!     → status.rs (upstream status mapping)
//!     → TransactionOutcome (200 resolved / 202 pending)
//! ```

pub mod orchestrator;
pub mod status;
pub mod types;

pub use orchestrator::{OrchestratorConfig, TransactionError, TransactionOrchestrator};
pub use status::TransactionStatus;
pub use types::{
    CreateTransactionRequest, OutcomeSource, RequestError, Resolution, TransactionOutcome,
    REQUIRED_FIELDS,
};
