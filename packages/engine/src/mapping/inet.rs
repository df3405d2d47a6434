// packages/engine/src/mapping/inet.rs
//! Inet port mapper
//!
//! Exact match on host-order port numbers. Byte order conversion happens
//! where addresses enter and leave the engine (`crate::address`).

use crate::mapping::parser::MappingValue;
use crate::mapping::{MappingEntry, MappingKind, MappingTable};
use tracing::debug;

/// Target value meaning "no valid target"
pub const UNSET_PORT: u16 = 0;

/// Inet port rewrite entry
pub type InetPortMapping = MappingEntry<u16>;

/// Inet port mapping table
pub type InetTable = MappingTable<u16>;

impl MappingValue for u16 {
    const KIND: MappingKind = MappingKind::Inet;
    
    /// Malformed or out-of-range tokens degrade to [`UNSET_PORT`]
    fn from_token(token: &str) -> Self {
        match token.parse::<u16>() {
            Ok(port) => port,
            Err(e) => {
                debug!("Port token {:?} is not a valid port ({}), using 0", token, e);
                UNSET_PORT
            }
        }
    }
    
    fn dangling_target(_source: &Self) -> Self {
        UNSET_PORT
    }
}

/// Resolve a port against the table
///
/// Returns the candidate itself when nothing matches or when the first
/// matching entry has an unset target.
pub fn resolve_port(candidate: u16, table: &InetTable) -> u16 {
    match table.iter().find(|entry| entry.source == candidate) {
        Some(entry) if entry.target != UNSET_PORT => entry.target,
        _ => candidate,
    }
}
