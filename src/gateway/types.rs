//! Wire types and error definitions for the MVola merchant-pay API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Currency code used by MVola for Ariary.
pub const CURRENCY: &str = "Ar";

/// Prefix the gateway expects on partner names and original references.
pub const PARTNER_PREFIX: &str = "APP_";

/// A `{"key": ..., "value": ...}` entry, used for parties and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn msisdn(value: &str) -> Vec<Self> {
        vec![Self::new("msisdn", value)]
    }
}

/// Body of the merchant-pay creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantPayment {
    pub amount: String,
    pub currency: String,
    pub description_text: String,
    pub requesting_organisation_transaction_reference: String,
    pub request_date: String,
    pub original_transaction_reference: String,
    pub debit_party: Vec<KeyValue>,
    pub credit_party: Vec<KeyValue>,
    pub metadata: Vec<KeyValue>,
}

impl MerchantPayment {
    /// Build a payment from a client debit to a partner credit.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        amount: String,
        client_msisdn: &str,
        partner_msisdn: &str,
        partner_name: &str,
        description: &str,
        reference: &str,
        correlation_id: &str,
        request_date: &str,
    ) -> Self {
        Self {
            amount,
            currency: CURRENCY.to_string(),
            description_text: description.to_string(),
            requesting_organisation_transaction_reference: reference.to_string(),
            request_date: request_date.to_string(),
            original_transaction_reference: format!("{}{}", PARTNER_PREFIX, correlation_id),
            debit_party: KeyValue::msisdn(client_msisdn),
            credit_party: KeyValue::msisdn(partner_msisdn),
            metadata: vec![
                KeyValue::new("partnerName", format!("{}{}", PARTNER_PREFIX, partner_name)),
                KeyValue::new("fc", CURRENCY),
                KeyValue::new("amountFc", "1"),
            ],
        }
    }
}

/// Partner identity sent with status and detail queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerContext {
    pub correlation_id: String,
    pub partner_msisdn: String,
    pub partner_name: String,
}

impl PartnerContext {
    /// `UserAccountIdentifier` header value.
    pub fn account_identifier(&self) -> String {
        format!("msisdn;{}", self.partner_msisdn)
    }

    /// `partnerName` header value.
    pub fn partner_header(&self) -> String {
        format!("{}{}", PARTNER_PREFIX, self.partner_name)
    }
}

/// An upstream "accepted" answer to a creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    /// Upstream transaction handle.
    pub server_correlation_id: String,
    /// HTTP status upstream answered with (200, 201 or 202).
    pub status: u16,
    pub body: Value,
}

/// Errors that can occur while talking to the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream answered with a non-success status, or accepted without a
    /// transaction handle. Carries the response verbatim.
    #[error("upstream answered with status {status}")]
    Rejected {
        status: u16,
        body: Vec<u8>,
        content_type: Option<String>,
    },

    /// The call exceeded its timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("upstream request failed: {0}")]
    Unreachable(String),

    /// Upstream answered successfully but the body is unusable.
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Passthrough error for a JSON body.
    pub fn rejected_json(status: u16, body: &Value) -> Self {
        Self::Rejected {
            status,
            body: body.to_string().into_bytes(),
            content_type: Some("application/json".to_string()),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::Timeout => "timeout",
            Self::Unreachable(_) => "unreachable",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
