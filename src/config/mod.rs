//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, MVOLA_BASE_URL override)
//!     → validation.rs (semantic checks)
//!     → BridgeConfig (validated, immutable)
//!     → cloned into each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, ConfigError};
pub use schema::BridgeConfig;
pub use schema::{
    AuditConfig, CallbackConfig, CallbackMethod, CorrelationLocation, FallbackStrategy,
    GatewayConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig, TransactionConfig,
};
