// packages/engine/src/interception/mod.rs
//! Interception boundary support
//!
//! The boundary itself (hooking `bind`, `connect` and `unlink` in a target
//! process) lives in the preload library. This module prepares the
//! environment that library is started with.
//!
//! ```text
//! sockmap run -- ./server
//!     │
//!     ├─ LD_PRELOAD=libsockmap_preload.so
//!     ├─ LD_PRELOAD_SOCKET_UNIX_SOCK_MAP=/run/a.sock:/tmp/a.sock
//!     └─ LD_PRELOAD_SOCKET_INET_PORT_MAP=80:8080
//!            │
//!            ▼
//!     server: bind(/run/a.sock) → engine → bind(/tmp/a.sock)
//! ```

pub mod syscall_interceptor;

// Re-export commonly used types
pub use syscall_interceptor::{SyscallConfig, SyscallInterceptor};
