//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the MVola callback bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Listener configuration (bind address, public URL).
    pub listener: ListenerConfig,

    /// Upstream MVola gateway settings.
    pub gateway: GatewayConfig,

    /// Callback wait and fallback behaviour.
    pub transactions: TransactionConfig,

    /// Inbound callback receiver settings.
    pub callback: CallbackConfig,

    /// Callback audit log.
    pub audit: AuditConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Externally reachable base URL used to build the default callback URL.
    /// When unset, the inbound `Host` header is used.
    pub public_base_url: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            public_base_url: None,
        }
    }
}

/// Upstream gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the MVola API.
    pub base_url: String,

    /// Token exchange timeout in seconds.
    pub token_timeout_secs: u64,

    /// Transaction creation timeout in seconds.
    pub create_timeout_secs: u64,

    /// Status check timeout in seconds.
    pub status_timeout_secs: u64,

    /// Detail fetch timeout in seconds.
    pub details_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://devapi.mvola.mg".to_string(),
            token_timeout_secs: 30,
            create_timeout_secs: 30,
            status_timeout_secs: 10,
            details_timeout_secs: 10,
        }
    }
}

/// What to do when no callback arrives before the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Query the status and detail endpoints once.
    #[default]
    Poll,
    /// Report the attempt as pending without querying upstream.
    GiveUp,
}

/// Transaction orchestration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// How long a create request waits for the callback, in seconds.
    pub callback_wait_secs: u64,

    /// Behaviour once the wait elapses.
    pub fallback: FallbackStrategy,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            callback_wait_secs: 20,
            fallback: FallbackStrategy::Poll,
        }
    }
}

/// HTTP method the gateway uses to deliver callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallbackMethod {
    #[default]
    Put,
    Post,
}

/// Where the correlation id lives inside a callback body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationLocation {
    /// An entry of the `metadata` list: `[{"key": ..., "value": ...}]`.
    #[default]
    Metadata,
    /// A flat top-level field.
    Field,
}

/// Callback receiver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Accepted method for the callback route.
    pub method: CallbackMethod,

    /// Shape of the correlation id in the body.
    pub correlation_location: CorrelationLocation,

    /// Metadata key or field name holding the correlation id.
    pub correlation_key: String,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            method: CallbackMethod::Put,
            correlation_location: CorrelationLocation::Metadata,
            correlation_key: "XCorrelationId".to_string(),
        }
    }
}

/// Callback audit log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Persist every received callback.
    pub enabled: bool,

    /// Append-only JSON lines file.
    pub path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "logs/mvola_callbacks.log".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    /// Must cover the callback wait plus the polling calls.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 90 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
