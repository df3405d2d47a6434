// packages/engine/src/mapping/unix.rs
//! Unix path mapper
//!
//! Matches AF_UNIX socket paths by prefix. The comparison covers the bytes
//! both strings share, so a source longer than the candidate still matches
//! when the candidate is a prefix of it:
//!
//! | source       | candidate     | match |
//! |--------------|---------------|-------|
//! | `/a`         | `/ab/sock`    | yes   |
//! | `/run/x.sock`| `/run`        | yes   |
//! | `/b`         | `/ab/sock`    | no    |
//!
//! The second row is surprising, but existing mapping tables rely on it.

use crate::mapping::parser::MappingValue;
use crate::mapping::{MappingEntry, MappingKind, MappingTable};

/// Unix path rewrite entry
pub type UnixPathMapping = MappingEntry<String>;

/// Unix path mapping table
pub type UnixTable = MappingTable<String>;

impl MappingValue for String {
    const KIND: MappingKind = MappingKind::Unix;
    
    fn from_token(token: &str) -> Self {
        token.to_string()
    }
    
    /// A lone path maps to itself (no-op placeholder)
    fn dangling_target(source: &Self) -> Self {
        source.clone()
    }
}

/// Whether `source` matches `candidate` over their shared length
///
/// Empty sources and empty candidates never match.
pub fn prefix_matches(source: &[u8], candidate: &[u8]) -> bool {
    if source.is_empty() || candidate.is_empty() {
        return false;
    }
    
    let overlap = source.len().min(candidate.len());
    source[..overlap] == candidate[..overlap]
}

/// Resolve a raw path against the table, first match wins
pub fn resolve_unix_bytes<'a>(candidate: &[u8], table: &'a UnixTable) -> Option<&'a str> {
    table
        .iter()
        .find(|entry| prefix_matches(entry.source.as_bytes(), candidate))
        .map(|entry| entry.target.as_str())
}

/// Resolve a path against the table, first match wins
pub fn resolve_unix<'a>(candidate: &str, table: &'a UnixTable) -> Option<&'a str> {
    resolve_unix_bytes(candidate.as_bytes(), table)
}
