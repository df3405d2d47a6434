// packages/engine/src/mapping/parser.rs
//! Mapping table parser
//!
//! Deliberately loose: there is no escaping, so a path or port can never
//! contain one of the separator characters. Runs of separators produce no
//! empty tokens. Each remaining token is trimmed of surrounding whitespace
//! (internal whitespace is kept) and tokens are paired in order.
//!
//! Parsing never fails. Payload types decide how a malformed token or a
//! dangling source (odd token count) degrades, see [`MappingValue`].

use crate::mapping::{MappingEntry, MappingKind, MappingTable};
use std::fmt;
use tracing::debug;

/// Token separators
pub const SEPARATORS: &[char] = &[':', ',', '\n'];

/// Payload of a mapping table
pub trait MappingValue: Clone + PartialEq + fmt::Debug + fmt::Display {
    /// Address family the payload belongs to
    const KIND: MappingKind;
    
    /// Convert a trimmed token into a value
    fn from_token(token: &str) -> Self;
    
    /// Target used when the input ends right after a source token
    fn dangling_target(source: &Self) -> Self;
}

/// Split raw input into trimmed tokens
pub fn tokenize(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(SEPARATORS)
        .filter(|token| !token.is_empty())
        .map(trim_token)
}

// C-locale whitespace, vertical tab included
pub(crate) fn trim_token(token: &str) -> &str {
    token.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b')
}

/// Parse a mapping table of any payload kind
pub fn parse<K: MappingValue>(raw: &str) -> MappingTable<K> {
    let mut entries = Vec::new();
    let mut tokens = tokenize(raw);
    
    while let Some(source_token) = tokens.next() {
        let source = K::from_token(source_token);
        let target = match tokens.next() {
            Some(target_token) => K::from_token(target_token),
            None => {
                let target = K::dangling_target(&source);
                debug!("Dangling {} source {} defaults to target {}", K::KIND, source, target);
                target
            }
        };
        
        entries.push(MappingEntry::new(source, target));
    }
    
    debug!("Parsed {} entries for {}", entries.len(), K::KIND);
    MappingTable::from_entries(entries)
}

/// Parse a unix path table
pub fn parse_unix(raw: &str) -> MappingTable<String> {
    parse(raw)
}

/// Parse an inet port table
pub fn parse_inet(raw: &str) -> MappingTable<u16> {
    parse(raw)
}
