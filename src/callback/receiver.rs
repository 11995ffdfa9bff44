//! Inbound callback handling.
//!
//! # Responsibilities
//! - Locate the correlation id (metadata entry or flat field)
//! - Map the reported status and hand it to the pending registry
//! - Record every callback in the audit trail, matched, unmatched or unreadable

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::callback::audit::{AuditRecord, CallbackAudit};
use crate::config::{CallbackConfig, CorrelationLocation};
use crate::correlation::{Delivery, PendingRegistry};
use crate::observability::metrics;
use crate::transactions::TransactionStatus;

/// Audit status of a callback whose body is not a JSON object.
pub const IGNORED_STATUS: &str = "IGNORED";

/// What the receiver did with one callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackReceipt {
    pub correlation_id: Option<String>,
    pub status: TransactionStatus,
    /// A waiting request was resolved.
    pub matched: bool,
}

/// Resolves pending requests from gateway callbacks.
#[derive(Clone)]
pub struct CallbackReceiver {
    registry: PendingRegistry,
    audit: Option<Arc<CallbackAudit>>,
    config: CallbackConfig,
}

impl CallbackReceiver {
    pub fn new(
        registry: PendingRegistry,
        audit: Option<Arc<CallbackAudit>>,
        config: CallbackConfig,
    ) -> Self {
        Self {
            registry,
            audit,
            config,
        }
    }

    /// Find the correlation id in a callback body.
    pub fn correlation_id(&self, body: &Value) -> Option<String> {
        let key = self.config.correlation_key.as_str();
        let raw = match self.config.correlation_location {
            CorrelationLocation::Field => body.get(key),
            CorrelationLocation::Metadata => body
                .get("metadata")
                .and_then(Value::as_array)
                .and_then(|entries| {
                    entries
                        .iter()
                        .find(|entry| entry.get("key").and_then(Value::as_str) == Some(key))
                })
                .and_then(|entry| entry.get("value")),
        }?;

        match raw {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Deliver a callback body to its waiting request, then audit it.
    pub async fn receive(&self, body: Value) -> CallbackReceipt {
        let correlation_id = self.correlation_id(&body);
        let status = TransactionStatus::from_record(&body);

        let matched = match &correlation_id {
            Some(id) => self.registry.deliver(
                id,
                Delivery {
                    status: status.clone(),
                    payload: body.clone(),
                },
            ),
            None => {
                tracing::warn!(
                    key = %self.config.correlation_key,
                    "Callback without correlation id"
                );
                false
            }
        };

        tracing::info!(
            correlation_id = correlation_id.as_deref().unwrap_or("N/A"),
            status = %status,
            matched,
            "Callback processed"
        );
        metrics::record_callback(if matched { "matched" } else { "unmatched" });

        self.audit(AuditRecord {
            timestamp: Utc::now(),
            correlation_id: correlation_id.clone(),
            status: status.to_string(),
            matched,
            data: body,
        })
        .await;

        CallbackReceipt {
            correlation_id,
            status,
            matched,
        }
    }

    /// Record a callback body that could not be read as a JSON object.
    ///
    /// The raw bytes are kept as a (lossy) JSON string.
    pub async fn ignore(&self, raw: &[u8]) {
        tracing::warn!(bytes = raw.len(), "Callback body is not a JSON object, ignoring");
        metrics::record_callback("ignored");

        self.audit(AuditRecord {
            timestamp: Utc::now(),
            correlation_id: None,
            status: IGNORED_STATUS.to_string(),
            matched: false,
            data: Value::String(String::from_utf8_lossy(raw).into_owned()),
        })
        .await;
    }

    async fn audit(&self, record: AuditRecord) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.append(&record).await {
            tracing::error!(
                path = ?audit.path(),
                error = %e,
                "Failed to write callback audit record"
            );
        }
    }
}
