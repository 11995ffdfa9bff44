//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, request id, trace, timeout)
//!     → handlers.rs
//!         POST /mvola/token        → gateway token exchange
//!         POST /mvola/transaction  → transactions::TransactionOrchestrator
//!         PUT  /mvola/callback     → callback::CallbackReceiver
//!         GET  /health
//!     → error.rs (ApiError → JSON, or upstream passthrough)
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
