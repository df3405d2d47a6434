// packages/engine/src/utils/errors.rs
//! Error types for the mapping engine
//!
//! Only cold-path failures surface here. Lookups themselves are total:
//! malformed port tokens, an absent inet table and oversized unix targets
//! are all recovered where they occur.

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// The mandatory unix path mapping variable is not set
    #[error("Mandatory mapping variable {variable} is not set")]
    ConfigMissing { variable: String },

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure while layering configuration sources
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Preload library could not be located
    #[error("Interception failed: {0}")]
    InterceptionFailed(String),

    /// Address text could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Logging subsystem could not be installed
    #[error("Observability error: {0}")]
    Observability(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether this error means the unix table is unavailable for the session
    pub fn is_config_missing(&self) -> bool {
        matches!(self, EngineError::ConfigMissing { .. })
    }
}

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, EngineError>;
