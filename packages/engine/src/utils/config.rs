// packages/engine/src/utils/config.rs
//! Engine configuration
//!
//! Layered with the `config` crate, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `sockmap.{toml,yaml,json}` in the working directory (optional)
//! 3. `SOCKMAP__<SECTION>__<KEY>` environment variables
//!
//! The mapping tables themselves are not part of this file. They are read
//! from the variables named in [`MappingConfig`] so the same strings can be
//! handed to the preloaded library in a child process.

use crate::utils::errors::{EngineError, Result};
use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default variable carrying the unix path mapping table
pub const DEFAULT_UNIX_ENV_VAR: &str = "LD_PRELOAD_SOCKET_UNIX_SOCK_MAP";

/// Default variable carrying the inet port mapping table
pub const DEFAULT_INET_ENV_VAR: &str = "LD_PRELOAD_SOCKET_INET_PORT_MAP";

/// Prefix for environment overrides
const ENV_PREFIX: &str = "SOCKMAP";

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mapping: MappingConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub preload: PreloadConfig,
}

/// Where mapping tables are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Variable holding the unix path table (mandatory at lookup time)
    pub unix_env_var: String,
    
    /// Variable holding the inet port table (optional)
    pub inet_env_var: String,
}

/// Logging output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    pub level: String,
    
    /// Emit JSON lines instead of the compact text format
    pub json: bool,
}

/// Preload library settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreloadConfig {
    /// Explicit library path; standard locations are searched when unset
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mapping: MappingConfig::default(),
            logging: LoggingConfig::default(),
            preload: PreloadConfig::default(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            unix_env_var: DEFAULT_UNIX_ENV_VAR.to_string(),
            inet_env_var: DEFAULT_INET_ENV_VAR.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from defaults, `./sockmap.*` and the environment
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::with_name("sockmap").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
        
        Self::finish(builder)
    }
    
    /// Load configuration with an explicit file in place of `./sockmap.*`
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
        
        Self::finish(builder)
    }
    
    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let defaults = EngineConfig::default();
        
        Ok(Config::builder()
            .set_default("mapping.unix_env_var", defaults.mapping.unix_env_var)?
            .set_default("mapping.inet_env_var", defaults.mapping.inet_env_var)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.json", defaults.logging.json)?)
    }
    
    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
    
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let unix = self.mapping.unix_env_var.trim();
        let inet = self.mapping.inet_env_var.trim();
        
        if unix.is_empty() || inet.is_empty() {
            return Err(EngineError::ConfigError(
                "Mapping variable names cannot be empty".to_string(),
            ));
        }
        
        if unix == inet {
            return Err(EngineError::ConfigError(format!(
                "Unix and inet mappings cannot share the variable {}",
                unix
            )));
        }
        
        Ok(())
    }
}
