// packages/engine/src/session/source.rs
//! Where a session reads its raw mapping strings from

use crate::utils::config::{MappingConfig, DEFAULT_INET_ENV_VAR, DEFAULT_UNIX_ENV_VAR};

/// Provider of the two raw mapping strings
///
/// `None` means "not set at all", which is distinct from an empty string.
pub trait MappingSource {
    /// Raw unix path table
    fn unix_map(&self) -> Option<String>;
    
    /// Raw inet port table
    fn inet_map(&self) -> Option<String>;
    
    /// Name reported when the unix table is missing
    fn unix_origin(&self) -> &str;
}

/// Reads mapping strings from the process environment
#[derive(Debug, Clone)]
pub struct EnvSource {
    unix_var: String,
    inet_var: String,
}

impl EnvSource {
    /// Create a source reading the given variables
    pub fn new(unix_var: impl Into<String>, inet_var: impl Into<String>) -> Self {
        Self {
            unix_var: unix_var.into(),
            inet_var: inet_var.into(),
        }
    }
    
    pub fn from_config(config: &MappingConfig) -> Self {
        Self::new(config.unix_env_var.clone(), config.inet_env_var.clone())
    }
    
    pub fn unix_var(&self) -> &str {
        &self.unix_var
    }
    
    pub fn inet_var(&self) -> &str {
        &self.inet_var
    }
    
    fn read(name: &str) -> Option<String> {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(DEFAULT_UNIX_ENV_VAR, DEFAULT_INET_ENV_VAR)
    }
}

impl MappingSource for EnvSource {
    fn unix_map(&self) -> Option<String> {
        Self::read(&self.unix_var)
    }
    
    fn inet_map(&self) -> Option<String> {
        Self::read(&self.inet_var)
    }
    
    fn unix_origin(&self) -> &str {
        &self.unix_var
    }
}

/// Fixed in-memory mapping strings
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    unix: Option<String>,
    inet: Option<String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }
    
    pub fn with_unix(mut self, raw: impl Into<String>) -> Self {
        self.unix = Some(raw.into());
        self
    }
    
    pub fn with_inet(mut self, raw: impl Into<String>) -> Self {
        self.inet = Some(raw.into());
        self
    }
}

impl MappingSource for StaticSource {
    fn unix_map(&self) -> Option<String> {
        self.unix.clone()
    }
    
    fn inet_map(&self) -> Option<String> {
        self.inet.clone()
    }
    
    fn unix_origin(&self) -> &str {
        "static unix mapping"
    }
}

impl<S: MappingSource + ?Sized> MappingSource for &S {
    fn unix_map(&self) -> Option<String> {
        (**self).unix_map()
    }
    
    fn inet_map(&self) -> Option<String> {
        (**self).inet_map()
    }
    
    fn unix_origin(&self) -> &str {
        (**self).unix_origin()
    }
}
