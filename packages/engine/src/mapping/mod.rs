// packages/engine/src/mapping/mod.rs
//! Address mapping tables
//!
//! Two structurally identical mappers share one token grammar:
//!
//! - **Unix Path Mapper**: AF_UNIX filesystem path rewrites (prefix match)
//! - **Inet Port Mapper**: AF_INET port rewrites (exact match)
//!
//! # Grammar
//!
//! ```text
//! table  := token (SEP token)*
//! SEP    := ':' | ',' | '\n'
//! token  := any run of non-separator characters, trimmed
//! ```
//!
//! Tokens pair up as `source`, `target`, `source`, `target`, ... and table
//! order is match priority: the first matching entry wins.

pub mod inet;
pub mod parser;
pub mod unix;

use crate::utils::errors::{EngineError, Result};
use serde::Serialize;
use std::fmt;

// Re-export commonly used types
pub use inet::{resolve_port, InetPortMapping, InetTable, UNSET_PORT};
pub use parser::{parse, parse_inet, parse_unix, MappingValue, SEPARATORS};
pub use unix::{prefix_matches, resolve_unix, resolve_unix_bytes, UnixPathMapping, UnixTable};

/// Address family a table applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MappingKind {
    /// AF_UNIX socket paths
    Unix,
    
    /// AF_INET ports
    Inet,
}

impl MappingKind {
    /// Label used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            MappingKind::Unix => "UNIX socket paths",
            MappingKind::Inet => "INET socket ports",
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single source -> target rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingEntry<K> {
    /// Address component to match against
    pub source: K,
    
    /// Replacement value
    pub target: K,
}

impl<K> MappingEntry<K> {
    pub fn new(source: K, target: K) -> Self {
        Self { source, target }
    }
}

impl<K: fmt::Display> fmt::Display for MappingEntry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Ordered mapping table
///
/// Sources are not unique. An earlier entry always shadows a later entry
/// with the same source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingTable<K> {
    entries: Vec<MappingEntry<K>>,
}

impl<K> MappingTable<K> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
    
    pub fn from_entries(entries: Vec<MappingEntry<K>>) -> Self {
        Self { entries }
    }
    
    pub fn entries(&self) -> &[MappingEntry<K>] {
        &self.entries
    }
    
    pub fn iter(&self) -> std::slice::Iter<'_, MappingEntry<K>> {
        self.entries.iter()
    }
    
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Clone> MappingTable<K> {
    /// Entries as plain `(source, target)` pairs
    pub fn pairs(&self) -> Vec<(K, K)> {
        self.entries
            .iter()
            .map(|entry| (entry.source.clone(), entry.target.clone()))
            .collect()
    }
}

impl<K: fmt::Display> MappingTable<K> {
    /// Encode the table back into the `src:dst,src:dst` grammar
    ///
    /// Every entry is written as an explicit pair. A value that is empty,
    /// has surrounding whitespace or contains a separator cannot survive
    /// tokenizing, so such tables are rejected instead of being encoded
    /// into something that parses differently.
    pub fn to_config_string(&self) -> Result<String> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        
        for entry in &self.entries {
            let source = encode_token(&entry.source)?;
            let target = encode_token(&entry.target)?;
            pairs.push(format!("{}:{}", source, target));
        }
        
        Ok(pairs.join(","))
    }
}

fn encode_token(value: &impl fmt::Display) -> Result<String> {
    let token = value.to_string();
    
    if token.is_empty() || token != parser::trim_token(&token) || token.contains(SEPARATORS) {
        return Err(EngineError::ConfigError(format!(
            "Mapping value {:?} cannot be encoded",
            token
        )));
    }
    
    Ok(token)
}

impl<K> Default for MappingTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K> IntoIterator for &'a MappingTable<K> {
    type Item = &'a MappingEntry<K>;
    type IntoIter = std::slice::Iter<'a, MappingEntry<K>>;
    
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
