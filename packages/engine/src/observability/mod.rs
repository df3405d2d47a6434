// packages/engine/src/observability/mod.rs
//! Logging setup and mapping diagnostics
//!
//! The library only emits `tracing` events. Installing a subscriber is left
//! to the binary (or whatever hosts the engine) via [`init_tracing`].
//! All output goes to stderr so it never mixes with a host program's stdout.

use crate::address::SocketOp;
use crate::session::MappingReport;
use crate::utils::config::LoggingConfig;
use crate::utils::errors::{EngineError, Result};
use std::fmt::Display;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| EngineError::Observability(format!("Invalid log level {:?}: {}", config.level, e)))?,
    };
    
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    
    installed.map_err(|e| EngineError::Observability(e.to_string()))
}

/// Log an applied rewrite, e.g. `Mapping AF_INET connect(80) to connect(8080)`
pub fn log_rewrite(family: &str, op: SocketOp, from: impl Display, to: impl Display) {
    info!("Mapping {} {}({}) to {}({})", family, op, from, op, to);
}

/// Log the startup summary of both tables
pub fn log_report(report: &MappingReport) {
    info!("{} mappings defined for UNIX socket paths", report.unix.len());
    for entry in &report.unix {
        info!("   '{}' -> '{}'", entry.source, entry.target);
    }
    
    info!("{} mappings defined for INET socket ports", report.inet.len());
    for entry in &report.inet {
        info!("   {} -> {}", entry.source, entry.target);
    }
}

/// Render the summary as plain text lines
pub fn format_report(report: &MappingReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.unix.len() + report.inet.len() + 2);
    
    lines.push(format!("{} mappings defined for UNIX socket paths", report.unix.len()));
    lines.extend(
        report
            .unix
            .iter()
            .map(|entry| format!("   '{}' -> '{}'", entry.source, entry.target)),
    );
    
    lines.push(format!("{} mappings defined for INET socket ports", report.inet.len()));
    lines.extend(
        report
            .inet
            .iter()
            .map(|entry| format!("   {} -> {}", entry.source, entry.target)),
    );
    
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, StaticSource};
    
    #[test]
    fn test_format_report() {
        let mut session = Session::new(
            StaticSource::new()
                .with_unix("/run/a.sock:/tmp/a.sock")
                .with_inet("80:8080,443:8443"),
        );
        let report = session.report_mappings().unwrap();
        
        assert_eq!(
            format_report(&report),
            vec![
                "1 mappings defined for UNIX socket paths".to_string(),
                "   '/run/a.sock' -> '/tmp/a.sock'".to_string(),
                "2 mappings defined for INET socket ports".to_string(),
                "   80 -> 8080".to_string(),
                "   443 -> 8443".to_string(),
            ]
        );
    }
    
    #[test]
    fn test_format_empty_report() {
        let mut session = Session::new(StaticSource::new().with_unix(""));
        let report = session.report_mappings().unwrap();
        assert_eq!(
            format_report(&report),
            vec![
                "0 mappings defined for UNIX socket paths".to_string(),
                "0 mappings defined for INET socket ports".to_string(),
            ]
        );
    }
}
