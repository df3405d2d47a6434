// packages/engine/src/main.rs
//! Sockmap command line
//!
//! Inspects mapping tables, resolves addresses the way an intercepted
//! process would, and launches programs under the preload library.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sockmap_engine::interception::{SyscallConfig, SyscallInterceptor};
use sockmap_engine::observability::{format_report, init_tracing, log_report};
use sockmap_engine::utils::config::EngineConfig;
use sockmap_engine::{BuildInfo, EnvSource, MappingSource, Session, SocketAddress, SocketOp};
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(
    name = "sockmap",
    version,
    about = "Redirect AF_UNIX socket paths and AF_INET ports"
)]
struct Cli {
    /// Configuration file (defaults to ./sockmap.{toml,yaml,json} when present)
    #[arg(short, long, global = true, env = "SOCKMAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the mapping tables read from the environment
    Report {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Resolve a socket address (`/path`, `unix:/path` or `ip:port`)
    Resolve {
        address: String,
        /// Call the address is used with
        #[arg(long, value_enum, default_value_t = OpArg::Connect)]
        op: OpArg,
    },
    /// Resolve the path an unlink would remove
    Unlink { path: String },
    /// Print shell exports for running a program under the preload library
    Env,
    /// Run a program under the preload library
    Run {
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OpArg {
    Bind,
    Connect,
}

impl From<OpArg> for SocketOp {
    fn from(op: OpArg) -> Self {
        match op {
            OpArg::Bind => SocketOp::Bind,
            OpArg::Connect => SocketOp::Connect,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::load().context("Failed to load configuration")?,
    };

    init_tracing(&config.logging)?;
    debug!("Starting sockmap {}", BuildInfo::current());

    let mut session = Session::new(EnvSource::from_config(&config.mapping));

    match cli.command {
        Commands::Report { json } => {
            let report = session.report_mappings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for line in format_report(&report) {
                    println!("{}", line);
                }
            }
        }
        Commands::Resolve { address, op } => {
            let address: SocketAddress = address.parse()?;
            match session.resolve_bind_or_connect(op.into(), &address)? {
                Some(rewritten) => println!("{}", rewritten),
                None => println!("{}", address),
            }
        }
        Commands::Unlink { path } => match session.resolve_unlink(&path)? {
            Some(mapped) => println!("{}", mapped),
            None => println!("{}", path),
        },
        Commands::Env => {
            let interceptor = interceptor_for(&config, &mut session)?;
            for (key, value) in interceptor.get_env_vars()? {
                println!("export {}='{}'", key, value.replace('\'', r"'\''"));
            }
        }
        Commands::Run { command } => {
            let interceptor = interceptor_for(&config, &mut session)?;
            let (program, args) = command
                .split_first()
                .context("No command given")?;

            info!("Running {} under sockmap", program);
            let status = interceptor
                .command(program, args)?
                .status()
                .with_context(|| format!("Failed to spawn {}", program))?;

            if !status.success() {
                error!("{} exited with {}", program, status);
            }
            std::process::exit(status.code().unwrap_or(1));
        }
    }

    Ok(())
}

/// Interceptor carrying the session's raw mapping strings, logging the tables once
fn interceptor_for(config: &EngineConfig, session: &mut Session) -> Result<SyscallInterceptor> {
    // Parses both tables, failing early when the unix mapping is missing
    let report = session.report_mappings()?;
    log_report(&report);

    let source = session.source();
    let syscall_config = SyscallConfig::from_engine_config(config)
        .with_raw_maps(source.unix_map(), source.inet_map());

    Ok(SyscallInterceptor::new(syscall_config))
}
