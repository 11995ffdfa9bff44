//! Upstream MVola gateway.
//!
//! # Data Flow
//! ```text
//! transactions::orchestrator / http handlers
//!     → Gateway trait (token, create, status, details)
//!     → client.rs (reqwest, one timeout per call)
//!     → MVola API
//! ```
//!
//! # Design Decisions
//! - Every outbound call carries its own deadline; nothing retries
//! - Non-success answers are captured verbatim so handlers can pass them through
//! - The trait seam lets the orchestrator run against an in-process fake

pub mod client;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

pub use client::MvolaClient;
pub use types::{Accepted, GatewayError, GatewayResult, KeyValue, MerchantPayment, PartnerContext};

/// Operations the bridge needs from the payment gateway.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Exchange consumer credentials for a bearer token.
    async fn request_token(
        &self,
        consumer_key: &str,
        consumer_secret: &str,
    ) -> GatewayResult<String>;

    /// Submit a merchant payment. Succeeds only on an accepted answer
    /// carrying a `serverCorrelationId`.
    async fn create_transaction(
        &self,
        token: &str,
        payment: &MerchantPayment,
        correlation_id: &str,
        callback_url: &str,
    ) -> GatewayResult<Accepted>;

    /// Query the status of an accepted transaction.
    async fn transaction_status(
        &self,
        token: &str,
        server_correlation_id: &str,
        ctx: &PartnerContext,
    ) -> GatewayResult<Value>;

    /// Fetch the full detail record behind an `objectReference`.
    async fn transaction_details(
        &self,
        token: &str,
        object_reference: &str,
        ctx: &PartnerContext,
    ) -> GatewayResult<Value>;
}
