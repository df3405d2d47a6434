// packages/engine/src/interception/syscall_interceptor.rs
//! Launch-side setup for the LD_PRELOAD interception boundary (Linux only)
//!
//! The preloaded library hooks `bind`, `connect` and `unlink` inside the
//! target process and calls into the mapping engine. This side only
//! prepares a child's environment:
//!
//! - `LD_PRELOAD` pointing at the library (prepended to any existing value)
//! - the unix path mapping variable (mandatory)
//! - the inet port mapping variable (optional)
//!
//! A child is never launched without the library: that would run the
//! program unmapped while looking like a mapped run.

use crate::mapping::{InetTable, UnixTable};
use crate::utils::config::{EngineConfig, MappingConfig};
use crate::utils::errors::{EngineError, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Standard install locations searched when no library path is configured
const STANDARD_LIBRARY_PATHS: &[&str] = &[
    "/usr/lib/sockmap/libsockmap_preload.so",
    "/usr/local/lib/sockmap/libsockmap_preload.so",
];

/// Syscall interceptor configuration
#[derive(Debug, Clone, Default)]
pub struct SyscallConfig {
    /// Path to preload library
    pub preload_library_path: Option<PathBuf>,
    
    /// Variable names the library reads its tables from
    pub mapping: MappingConfig,
    
    /// Unix path table in the mapping grammar
    pub unix_map: Option<String>,
    
    /// Inet port table in the mapping grammar
    pub inet_map: Option<String>,
}

impl SyscallConfig {
    /// Configuration for the given engine settings, without tables
    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self {
            preload_library_path: config.preload.library_path.clone(),
            mapping: config.mapping.clone(),
            unix_map: None,
            inet_map: None,
        }
    }
    
    /// Hand the raw mapping strings to the child unchanged
    pub fn with_raw_maps(mut self, unix: Option<String>, inet: Option<String>) -> Self {
        self.unix_map = unix;
        self.inet_map = inet;
        self
    }
    
    /// Attach structured tables, encoded in the mapping grammar
    ///
    /// Fails for tables holding values the grammar cannot carry.
    pub fn with_tables(mut self, unix: &UnixTable, inet: &InetTable) -> Result<Self> {
        self.unix_map = Some(unix.to_config_string()?);
        self.inet_map = if inet.is_empty() {
            None
        } else {
            Some(inet.to_config_string()?)
        };
        Ok(self)
    }
}

/// Syscall interceptor (Linux only)
pub struct SyscallInterceptor {
    config: SyscallConfig,
}

impl SyscallInterceptor {
    /// Create a new syscall interceptor
    pub fn new(config: SyscallConfig) -> Self {
        Self { config }
    }
    
    pub fn config(&self) -> &SyscallConfig {
        &self.config
    }
    
    /// Locate the preload library
    ///
    /// An explicitly configured path must exist; otherwise the standard
    /// install locations are searched in order.
    #[cfg(target_os = "linux")]
    pub fn locate_library(&self) -> Result<PathBuf> {
        if let Some(lib_path) = &self.config.preload_library_path {
            return if lib_path.is_file() {
                Ok(lib_path.clone())
            } else {
                Err(EngineError::InterceptionFailed(format!(
                    "Preload library not found: {}",
                    lib_path.display()
                )))
            };
        }
        
        STANDARD_LIBRARY_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                EngineError::InterceptionFailed(format!(
                    "No preload library configured and none found in {}",
                    STANDARD_LIBRARY_PATHS.join(", ")
                ))
            })
    }
    
    #[cfg(not(target_os = "linux"))]
    pub fn locate_library(&self) -> Result<PathBuf> {
        Err(EngineError::InterceptionFailed(
            "Socket interception is only supported on Linux".to_string(),
        ))
    }
    
    /// Check if syscall interception is available
    pub fn is_available(&self) -> bool {
        self.locate_library().is_ok()
    }
    
    /// Environment variables for a child process
    ///
    /// Fails when no unix table is attached or the preload library cannot
    /// be found.
    pub fn get_env_vars(&self) -> Result<Vec<(String, String)>> {
        let unix_map = self.config.unix_map.clone().ok_or_else(|| EngineError::ConfigMissing {
            variable: self.config.mapping.unix_env_var.clone(),
        })?;
        
        let library = self.locate_library()?;
        debug!("Using LD_PRELOAD library: {}", library.display());
        
        let library = library.to_string_lossy().into_owned();
        let preload = match std::env::var("LD_PRELOAD") {
            Ok(existing) if !existing.trim().is_empty() => format!("{}:{}", library, existing),
            _ => library,
        };
        
        let mut env_vars = vec![
            ("LD_PRELOAD".to_string(), preload),
            (self.config.mapping.unix_env_var.clone(), unix_map),
        ];
        
        if let Some(inet_map) = &self.config.inet_map {
            env_vars.push((self.config.mapping.inet_env_var.clone(), inet_map.clone()));
        }
        
        Ok(env_vars)
    }
    
    /// Build a command that runs `program` under the interceptor
    pub fn command<I, A>(&self, program: &str, args: I) -> Result<Command>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<std::ffi::OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args).envs(self.get_env_vars()?);
        Ok(command)
    }
}

impl Default for SyscallInterceptor {
    fn default() -> Self {
        Self::new(SyscallConfig::default())
    }
}
