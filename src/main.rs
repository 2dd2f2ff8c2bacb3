//! Ceph State Reconciler CLI
//!
//! Reconciles a declarative description of Ceph administrative objects
//! (CRUSH rules, pools, cluster users) against the Ceph Dashboard REST
//! API.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Apply Driver                          │
//! │   create missing · update mutable drift · replace immutable  │
//! ├──────────────────────────────────────────────────────────────┤
//! │          Reconciler<C>  (one per resource kind)              │
//! │   ┌────────────┐   ┌────────────────┐   ┌────────────────┐   │
//! │   │ PoolCodec  │   │ CrushRuleCodec │   │   UserCodec    │   │
//! │   └────────────┘   └────────────────┘   └───────┬────────┘   │
//! │                                          keyring extractor   │
//! ├──────────────────────────────────────────────────────────────┤
//! │        Session (bearer token, versioned accept header)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ceph_state_reconciler::{
    apply, cluster, config::DesiredState, export_key, Session, SessionConfig,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Declarative state reconciler for Ceph Dashboard administrative objects
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ceph Dashboard URL (e.g. https://ceph-dashboard.example.com:8443)
    #[arg(long, env = "CEPH_DASHBOARD_URL")]
    url: String,

    /// Dashboard username
    #[arg(long, env = "CEPH_DASHBOARD_USERNAME", default_value = "")]
    username: String,

    /// Dashboard password
    #[arg(long, env = "CEPH_DASHBOARD_PASSWORD", default_value = "")]
    password: String,

    /// Skip TLS certificate verification
    #[arg(long, env = "CEPH_DASHBOARD_INSECURE")]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "10")]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the cluster toward a desired-state file
    Apply {
        /// Desired-state YAML file
        file: PathBuf,
    },
    /// Delete every resource a desired-state file declares
    Destroy {
        /// Desired-state YAML file
        file: PathBuf,
    },
    /// Print the exported secret key for one user entity
    ExportKey {
        /// User entity, e.g. client.app
        entity: String,
    },
    /// Print cluster FSID and monitor roster
    Status,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Ceph state reconciler");
    info!("  Version: {}", ceph_state_reconciler::VERSION);
    info!("  Dashboard: {}", args.url);

    let session_config = SessionConfig {
        url: args.url.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
        insecure: args.insecure,
        timeout: Duration::from_secs(args.timeout_secs),
    };
    let session = Arc::new(
        Session::connect(&session_config)
            .await
            .context("connecting to dashboard")?,
    );

    match &args.command {
        Command::Apply { file } => {
            let state = DesiredState::from_file(file)
                .with_context(|| format!("loading {}", file.display()))?;
            let report = apply::apply(session, &state).await?;
            println!(
                "applied: {} created, {} updated, {} replaced, {} unchanged",
                report.created.len(),
                report.updated.len(),
                report.replaced.len(),
                report.unchanged.len()
            );
        }
        Command::Destroy { file } => {
            let state = DesiredState::from_file(file)
                .with_context(|| format!("loading {}", file.display()))?;
            let report = apply::destroy(session, &state).await?;
            println!("destroyed: {} deleted", report.deleted.len());
        }
        Command::ExportKey { entity } => {
            let key = export_key(&session, entity).await?;
            println!("{}", key);
        }
        Command::Status => {
            let fsid = cluster::cluster_fsid(&session).await?;
            println!("fsid: {}", fsid);
            for mon in cluster::monitors(&session).await? {
                println!("mon.{} rank={} addr={}", mon.name, mon.rank, mon.public_addr);
            }
        }
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("reqwest=warn".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
