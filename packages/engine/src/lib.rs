// packages/engine/src/lib.rs
//! Sockmap Address Mapping Engine Library
//!
//! Redirects AF_UNIX socket paths and AF_INET ports according to a compact
//! textual mapping, so a process can be pointed at different sockets
//! without changing its code or configuration.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **mapping**: Table parser, unix path mapper, inet port mapper
//! - **address**: Socket address model and fixed-capacity path buffers
//! - **session**: Per-context table cache and the resolution API
//! - **interception**: Environment setup for the LD_PRELOAD boundary
//! - **observability**: Tracing setup and mapping diagnostics
//! - **utils**: Errors and configuration
//!
//! ```text
//! bind/connect/unlink ─→ Session::resolve_* ─→ unix / inet mapper
//!                              │ (first use)
//!                              ▼
//!                        parse mapping string
//! ```

// Public module exports
pub mod address;
pub mod interception;
pub mod mapping;
pub mod observability;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use address::{SocketAddress, SocketOp, SunPath, SUN_PATH_CAPACITY};
pub use mapping::{MappingEntry, MappingKind, MappingTable};
pub use session::{EnvSource, MappingReport, MappingSource, Session, StaticSource};
pub use utils::config::EngineConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Engine build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "v{} ({}, built {} with {})",
            self.version, self.git_hash, self.build_timestamp, self.rustc_version
        )
    }
}
