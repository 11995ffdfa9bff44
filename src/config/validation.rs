//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, non-empty URLs and keys)
//! - Check that the inbound request timeout covers the worst-case transaction
//!   (create call, callback wait, status poll, details fetch)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::BridgeConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    }

    if config.gateway.base_url.trim().is_empty() {
        errors.push(ValidationError::new("gateway.base_url", "must not be empty"));
    }

    let gateway_timeouts = [
        ("gateway.token_timeout_secs", config.gateway.token_timeout_secs),
        ("gateway.create_timeout_secs", config.gateway.create_timeout_secs),
        ("gateway.status_timeout_secs", config.gateway.status_timeout_secs),
        ("gateway.details_timeout_secs", config.gateway.details_timeout_secs),
    ];
    for (field, secs) in gateway_timeouts {
        if secs == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.transactions.callback_wait_secs == 0 {
        errors.push(ValidationError::new(
            "transactions.callback_wait_secs",
            "must be greater than zero",
        ));
    }

    let transaction_budget = transaction_budget_secs(config);
    if config.timeouts.request_secs <= transaction_budget {
        errors.push(ValidationError::new(
            "timeouts.request_secs",
            format!(
                "must exceed the worst-case transaction time of {}s \
                 (create + callback wait + status + details)",
                transaction_budget
            ),
        ));
    }

    if config.callback.correlation_key.trim().is_empty() {
        errors.push(ValidationError::new("callback.correlation_key", "must not be empty"));
    }

    if config.audit.enabled && config.audit.path.trim().is_empty() {
        errors.push(ValidationError::new("audit.path", "must not be empty when audit is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Longest time a single transaction request can legitimately take.
fn transaction_budget_secs(config: &BridgeConfig) -> u64 {
    config.gateway.create_timeout_secs
        + config.transactions.callback_wait_secs
        + config.gateway.status_timeout_secs
        + config.gateway.details_timeout_secs
}
