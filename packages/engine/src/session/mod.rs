// packages/engine/src/session/mod.rs
//! Session cache and resolution API
//!
//! A [`Session`] owns the parsed unix and inet tables for one execution
//! context. Each table is parsed lazily, at most once, the first time a
//! lookup needs it (or on [`Session::init`]). The two tables are
//! independent: a missing unix mapping never blocks inet lookups.
//!
//! Sessions are not shared. Every context builds its own from the same
//! configuration strings, which keeps lookups lock-free and lets two
//! contexts carry different mappings.
//!
//! # Example
//!
//! ```
//! use sockmap_engine::session::{Session, StaticSource};
//! use sockmap_engine::SocketAddress;
//!
//! let source = StaticSource::new()
//!     .with_unix("/run/app.sock:/tmp/app.sock")
//!     .with_inet("80:8080");
//! let mut session = Session::new(source);
//!
//! let rewritten = session
//!     .resolve(&"127.0.0.1:80".parse::<SocketAddress>().unwrap())
//!     .unwrap();
//! assert_eq!(rewritten, Some("127.0.0.1:8080".parse().unwrap()));
//! ```

pub mod source;

use crate::address::{SocketAddress, SocketOp, SunPath};
use crate::mapping::{
    parse_inet, parse_unix, resolve_port, resolve_unix, resolve_unix_bytes, InetPortMapping,
    InetTable, MappingKind, MappingTable, UnixPathMapping, UnixTable,
};
use crate::observability;
use crate::utils::errors::{EngineError, Result};
use serde::Serialize;
use std::convert::Infallible;
use tracing::{debug, warn};

pub use source::{EnvSource, MappingSource, StaticSource};

/// Parse state of one table
#[derive(Debug, PartialEq, Eq)]
pub enum TableState<'a, K> {
    /// Not loaded yet
    Unparsed,
    
    /// Loaded and cached for the rest of the session
    Parsed(&'a MappingTable<K>),
}

impl<K> TableState<'_, K> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, TableState::Parsed(_))
    }
}

impl<K> Clone for TableState<'_, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for TableState<'_, K> {}

/// Lazily loaded table owned by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSlot<K> {
    table: Option<MappingTable<K>>,
}

impl<K> TableSlot<K> {
    pub fn new() -> Self {
        Self { table: None }
    }
    
    pub fn state(&self) -> TableState<'_, K> {
        match &self.table {
            Some(table) => TableState::Parsed(table),
            None => TableState::Unparsed,
        }
    }
    
    /// Return the cached table, running `load` first if needed
    ///
    /// A failed load leaves the slot unparsed.
    fn get_or_load<E, F>(&mut self, load: F) -> std::result::Result<&MappingTable<K>, E>
    where
        F: FnOnce() -> std::result::Result<MappingTable<K>, E>,
    {
        let table = match self.table.take() {
            Some(table) => table,
            None => load()?,
        };
        Ok(self.table.insert(table))
    }
}

impl<K> Default for TableSlot<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostic snapshot of both parsed tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingReport {
    pub unix: Vec<UnixPathMapping>,
    pub inet: Vec<InetPortMapping>,
}

impl MappingReport {
    /// Unix entries as `(source, target)` pairs
    pub fn unix_pairs(&self) -> Vec<(String, String)> {
        self.unix
            .iter()
            .map(|entry| (entry.source.clone(), entry.target.clone()))
            .collect()
    }
    
    /// Inet entries as `(source, target)` pairs
    pub fn inet_pairs(&self) -> Vec<(u16, u16)> {
        self.inet.iter().map(|entry| (entry.source, entry.target)).collect()
    }
}

/// Per-context mapping session
pub struct Session<S: MappingSource = EnvSource> {
    source: S,
    unix_table: TableSlot<String>,
    inet_table: TableSlot<u16>,
}

impl<S: MappingSource> Session<S> {
    /// Create a session; nothing is parsed until first use
    pub fn new(source: S) -> Self {
        Self {
            source,
            unix_table: TableSlot::new(),
            inet_table: TableSlot::new(),
        }
    }
    
    pub fn source(&self) -> &S {
        &self.source
    }
    
    pub fn unix_state(&self) -> TableState<'_, String> {
        self.unix_table.state()
    }
    
    pub fn inet_state(&self) -> TableState<'_, u16> {
        self.inet_table.state()
    }
    
    /// Parse both tables now instead of on first lookup
    pub fn init(&mut self) -> Result<()> {
        self.inet_table();
        self.unix_table()?;
        Ok(())
    }
    
    /// The unix table, parsed on first access
    ///
    /// Fails with [`EngineError::ConfigMissing`] while the unix mapping is
    /// not set; the table then stays unparsed.
    pub fn unix_table(&mut self) -> Result<&UnixTable> {
        let source = &self.source;
        self.unix_table.get_or_load(|| match source.unix_map() {
            Some(raw) => {
                let table = parse_unix(&raw);
                debug!("Loaded {} {} mappings", table.len(), MappingKind::Unix);
                Ok(table)
            }
            None => Err(EngineError::ConfigMissing {
                variable: source.unix_origin().to_string(),
            }),
        })
    }
    
    /// The inet table, parsed on first access; an absent mapping is empty
    pub fn inet_table(&mut self) -> &InetTable {
        let source = &self.source;
        let loaded = self.inet_table.get_or_load(|| {
            let table = match source.inet_map() {
                Some(raw) => parse_inet(&raw),
                None => {
                    debug!("No inet port mapping set, using an empty table");
                    InetTable::new()
                }
            };
            debug!("Loaded {} {} mappings", table.len(), MappingKind::Inet);
            Ok::<_, Infallible>(table)
        });
        
        match loaded {
            Ok(table) => table,
            Err(never) => match never {},
        }
    }
    
    /// Resolve an address without attributing it to a call
    ///
    /// Returns the rewritten address, or `None` when the address is left
    /// as is. Unix addresses are rewritten whenever an entry matches (an
    /// identity entry included); inet addresses only when the port changes.
    pub fn resolve(&mut self, address: &SocketAddress) -> Result<Option<SocketAddress>> {
        match address {
            SocketAddress::Unix(path) => {
                let table = self.unix_table()?;
                Ok(resolve_unix_bytes(path.as_bytes(), table).map(|target| {
                    let (rewritten, outcome) = SunPath::copy_from(target.as_bytes());
                    if outcome.truncated {
                        warn!(
                            "Mapped path {} exceeds socket path capacity, truncated to {}",
                            target, rewritten
                        );
                    }
                    SocketAddress::Unix(rewritten)
                }))
            }
            SocketAddress::Inet(inet) => {
                let port = resolve_port(inet.port(), self.inet_table());
                if port == inet.port() {
                    Ok(None)
                } else {
                    Ok(Some(SocketAddress::inet(*inet.ip(), port)))
                }
            }
            SocketAddress::Other { .. } => Ok(None),
        }
    }
    
    /// Resolve the address of a `bind` or `connect` call
    pub fn resolve_bind_or_connect(
        &mut self,
        op: SocketOp,
        address: &SocketAddress,
    ) -> Result<Option<SocketAddress>> {
        let rewritten = self.resolve(address)?;
        
        match (address, &rewritten) {
            (SocketAddress::Unix(from), Some(SocketAddress::Unix(to))) => {
                observability::log_rewrite("AF_UNIX", op, from, to);
            }
            (SocketAddress::Inet(from), Some(SocketAddress::Inet(to))) => {
                observability::log_rewrite("AF_INET", op, from.port(), to.port());
            }
            _ => {}
        }
        
        Ok(rewritten)
    }
    
    /// Resolve the path of an `unlink` call
    ///
    /// Uses the same table and match rule as unix `bind`, so an
    /// unlink-then-bind sequence touches the same rewritten path.
    pub fn resolve_unlink(&mut self, pathname: &str) -> Result<Option<String>> {
        let table = self.unix_table()?;
        let mapped = resolve_unix(pathname, table).map(str::to_string);
        
        if let Some(target) = &mapped {
            observability::log_rewrite("AF_UNIX", SocketOp::Unlink, pathname, target);
        }
        
        Ok(mapped)
    }
    
    /// Snapshot both tables, parsing them if needed
    pub fn report_mappings(&mut self) -> Result<MappingReport> {
        let inet = self.inet_table().entries().to_vec();
        let unix = self.unix_table()?.entries().to_vec();
        Ok(MappingReport { unix, inet })
    }
}

impl Default for Session<EnvSource> {
    fn default() -> Self {
        Self::new(EnvSource::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    
    fn session(unix: &str, inet: &str) -> Session<StaticSource> {
        Session::new(StaticSource::new().with_unix(unix).with_inet(inet))
    }
    
    #[test]
    fn test_lazy_parse() {
        let mut session = session("/a:/b", "80:8080");
        assert!(!session.unix_state().is_parsed());
        assert!(!session.inet_state().is_parsed());
        
        session.resolve(&SocketAddress::inet(Ipv4Addr::LOCALHOST, 80)).unwrap();
        assert!(session.inet_state().is_parsed());
        assert!(!session.unix_state().is_parsed());
        
        session.resolve(&SocketAddress::unix("/a")).unwrap();
        assert!(session.unix_state().is_parsed());
    }
    
    #[test]
    fn test_init_parses_both() {
        let mut session = session("/a:/b", "");
        session.init().unwrap();
        assert!(session.unix_state().is_parsed());
        assert!(session.inet_state().is_parsed());
    }
    
    #[test]
    fn test_missing_unix_is_fatal_for_unix_only() {
        let mut session = Session::new(StaticSource::new().with_inet("80:8080"));
        
        let err = session.resolve(&SocketAddress::unix("/a")).unwrap_err();
        assert!(err.is_config_missing());
        assert!(!session.unix_state().is_parsed());
        assert!(session.init().is_err());
        
        let rewritten = session
            .resolve(&SocketAddress::inet(Ipv4Addr::LOCALHOST, 80))
            .unwrap();
        assert_eq!(rewritten, Some(SocketAddress::inet(Ipv4Addr::LOCALHOST, 8080)));
    }
    
    #[test]
    fn test_missing_inet_is_empty() {
        let mut session = Session::new(StaticSource::new().with_unix(""));
        assert!(session.inet_table().is_empty());
        
        let addr = SocketAddress::inet(Ipv4Addr::LOCALHOST, 443);
        assert_eq!(session.resolve(&addr).unwrap(), None);
    }
    
    #[test]
    fn test_resolve_unix() {
        let mut session = session("/a:/X,/ab:/Y", "");
        let rewritten = session.resolve(&SocketAddress::unix("/ab/sock")).unwrap();
        assert_eq!(rewritten, Some(SocketAddress::unix("/X")));
        
        assert_eq!(session.resolve(&SocketAddress::unix("/zz")).unwrap(), None);
        assert_eq!(session.resolve(&SocketAddress::unix("")).unwrap(), None);
    }
    
    #[test]
    fn test_resolve_unix_identity_entry() {
        let mut session = session("/run/log.sock", "");
        let addr = SocketAddress::unix("/run/log.sock");
        assert_eq!(session.resolve(&addr).unwrap(), Some(addr));
    }
    
    #[test]
    fn test_resolve_unix_truncates_target() {
        let long_target = format!("/{}", "t".repeat(300));
        let mut session = session(&format!("/run/a.sock:{}", long_target), "");
        
        let rewritten = session.resolve(&SocketAddress::unix("/run/a.sock")).unwrap();
        match rewritten {
            Some(SocketAddress::Unix(path)) => {
                assert_eq!(path.len(), crate::address::SUN_PATH_CAPACITY - 1);
                assert!(long_target.as_bytes().starts_with(path.as_bytes()));
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }
    
    #[test]
    fn test_resolve_inet_keeps_ip() {
        let mut session = session("", "5432:15432");
        let addr = SocketAddress::inet(Ipv4Addr::new(10, 1, 2, 3), 5432);
        assert_eq!(
            session.resolve(&addr).unwrap(),
            Some(SocketAddress::inet(Ipv4Addr::new(10, 1, 2, 3), 15432))
        );
    }
    
    #[test]
    fn test_other_family_passes_through() {
        // No unix mapping at all: other families must not touch either table
        let mut session = Session::new(StaticSource::new());
        let addr = SocketAddress::Other { family: libc::AF_INET6 };
        assert_eq!(session.resolve(&addr).unwrap(), None);
        assert!(!session.unix_state().is_parsed());
        assert!(!session.inet_state().is_parsed());
    }
    
    #[test]
    fn test_unlink_agrees_with_bind() {
        let mut session = session("/run/app:/tmp/app.sock", "");
        
        let bound = session
            .resolve_bind_or_connect(SocketOp::Bind, &SocketAddress::unix("/run/app/api.sock"))
            .unwrap();
        let unlinked = session.resolve_unlink("/run/app/api.sock").unwrap();
        
        assert_eq!(unlinked.as_deref(), Some("/tmp/app.sock"));
        assert_eq!(bound, Some(SocketAddress::unix("/tmp/app.sock")));
        assert_eq!(session.resolve_unlink("/etc/passwd").unwrap(), None);
    }
    
    #[test]
    fn test_table_cached_after_first_parse() {
        let mut session = session("/a:/b", "");
        session.init().unwrap();
        let before = session.unix_table().unwrap().clone();
        
        session.resolve(&SocketAddress::unix("/a")).unwrap();
        assert_eq!(session.unix_state(), TableState::Parsed(&before));
    }
    
    #[test]
    fn test_failed_load_can_be_retried() {
        let mut slot: TableSlot<String> = TableSlot::new();
        
        let failed: std::result::Result<_, &str> = slot.get_or_load(|| Err("unset"));
        assert!(failed.is_err());
        assert_eq!(slot.state(), TableState::Unparsed);
        
        let loaded = slot
            .get_or_load(|| Ok::<_, &str>(parse_unix("/a:/b")))
            .unwrap()
            .clone();
        assert_eq!(slot.state(), TableState::Parsed(&loaded));
        
        // Cached: a second loader is never called
        let cached = slot
            .get_or_load(|| Err::<MappingTable<String>, _>("not called"))
            .unwrap();
        assert_eq!(cached, &loaded);
    }
    
    #[test]
    fn test_report_mappings() {
        let mut session = session("/a:/b,/c", "80:8080,22");
        let report = session.report_mappings().unwrap();
        
        assert_eq!(
            report.unix_pairs(),
            vec![
                ("/a".to_string(), "/b".to_string()),
                ("/c".to_string(), "/c".to_string()),
            ]
        );
        assert_eq!(report.inet_pairs(), vec![(80, 8080), (22, 0)]);
        
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["unix"][0]["source"], "/a");
        assert_eq!(json["inet"][1]["target"], 0);
    }
    
    #[test]
    fn test_independent_sessions() {
        let mut first = session("/a:/b", "1:2");
        let mut second = session("/a:/b", "1:2");
        
        assert_eq!(first.report_mappings().unwrap(), second.report_mappings().unwrap());
    }
}
