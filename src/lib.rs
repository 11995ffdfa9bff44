//! MVola payment bridge library.
//!
//! Accepts merchant-pay requests, submits them to the MVola gateway and holds
//! the caller's request open until the matching asynchronous callback arrives,
//! falling back to status polling when it does not.

// Core flow
pub mod correlation;
pub mod gateway;
pub mod transactions;
pub mod callback;

// Boundary
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::BridgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
