//! Transaction request and outcome types.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::gateway::{MerchantPayment, PartnerContext};
use crate::transactions::TransactionStatus;

/// Fields a create request must carry.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "amount",
    "clientMsisdn",
    "partnerMsisdn",
    "descriptionTransaction",
    "referenceID",
    "name",
];

/// Problems with an inbound create request body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("JSON body required")]
    NotAnObject,

    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("invalid field: {0}")]
    InvalidField(String),
}

/// Inbound "create transaction" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    /// Number or string; forwarded upstream as a string.
    pub amount: Value,
    pub client_msisdn: String,
    pub partner_msisdn: String,
    pub description_transaction: String,
    #[serde(rename = "referenceID")]
    pub reference_id: String,
    /// Partner name.
    pub name: String,
    #[serde(rename = "xCorrelationID", default)]
    pub x_correlation_id: Option<String>,
    #[serde(default)]
    pub request_date: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl CreateTransactionRequest {
    /// Validate required fields, then deserialize.
    pub fn from_json(body: &Value) -> Result<Self, RequestError> {
        let object = body.as_object().ok_or(RequestError::NotAnObject)?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| object.get(**field).map_or(true, Value::is_null))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RequestError::MissingFields(missing));
        }

        serde_json::from_value(body.clone()).map_err(|e| RequestError::InvalidField(e.to_string()))
    }

    /// Amount rendered the way the gateway expects it.
    pub fn amount_text(&self) -> String {
        match &self.amount {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Caller-supplied correlation id, if any.
    pub fn supplied_correlation_id(&self) -> Option<&str> {
        self.x_correlation_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Build the outbound merchant payment.
    pub fn to_payment(&self, correlation_id: &str, request_date: &str) -> MerchantPayment {
        MerchantPayment::new(
            self.amount_text(),
            &self.client_msisdn,
            &self.partner_msisdn,
            &self.name,
            &self.description_transaction,
            &self.reference_id,
            correlation_id,
            request_date,
        )
    }

    /// Partner identity for status and detail queries.
    pub fn partner_context(&self, correlation_id: &str) -> PartnerContext {
        PartnerContext {
            correlation_id: correlation_id.to_string(),
            partner_msisdn: self.partner_msisdn.clone(),
            partner_name: self.name.clone(),
        }
    }
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn default_request_date() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Where the final status came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    Callback,
    ApiPolling,
    /// No definitive result was obtained.
    None,
}

impl OutcomeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Callback => "callback",
            Self::ApiPolling => "api_polling",
            Self::None => "none",
        }
    }
}

/// Whether the attempt reached a definitive status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    Pending,
}

/// Final response document for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    #[serde(skip)]
    pub resolution: Resolution,
    pub status: TransactionStatus,
    pub x_correlation_id: String,
    pub server_correlation_id: String,
    pub source: OutcomeSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_reference: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit_party: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_party: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Value>,
}

impl TransactionOutcome {
    /// Definitive outcome built from a callback payload or polled detail record.
    pub fn resolved(
        status: TransactionStatus,
        source: OutcomeSource,
        correlation_id: &str,
        server_correlation_id: &str,
        record: &Value,
    ) -> Self {
        let field = |name: &str| record.get(name).filter(|v| !v.is_null()).cloned();
        Self {
            resolution: Resolution::Resolved,
            status,
            x_correlation_id: correlation_id.to_string(),
            server_correlation_id: server_correlation_id.to_string(),
            source,
            message: None,
            transaction_reference: field("transactionReference"),
            request_date: field("requestDate"),
            creation_date: field("creationDate"),
            debit_party: field("debitParty"),
            credit_party: field("creditParty"),
            fees: field("fees"),
            amount: field("amount"),
            currency: field("currency"),
        }
    }

    /// Accepted upstream, but no definitive status within budget.
    pub fn pending(
        correlation_id: &str,
        server_correlation_id: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            resolution: Resolution::Pending,
            status: TransactionStatus::Pending,
            x_correlation_id: correlation_id.to_string(),
            server_correlation_id: server_correlation_id.to_string(),
            source: OutcomeSource::None,
            message: Some(message.into()),
            transaction_reference: None,
            request_date: None,
            creation_date: None,
            debit_party: None,
            credit_party: None,
            fees: None,
            amount: None,
            currency: None,
        }
    }
}
