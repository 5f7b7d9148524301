//! wardend — the warden daemon.
//!
//! Single binary that assembles the monitors:
//! - Enclave monitor (kurtosis service tables, docker restarts)
//! - Process monitor (pgrep presence probes)
//! - Alert fan-out (dingtalk / generic webhooks)
//!
//! # Usage
//!
//! ```text
//! wardend init --config warden.toml
//! wardend check --config warden.toml
//! wardend run --config warden.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use warden_alert::Alerter;
use warden_core::{GroupObservation, LogConfig, WardenConfig};
use warden_enclave::EnclaveMonitor;
use warden_exec::{CommandRunner, SystemRunner, command_available};
use warden_process::ProcessMonitor;

#[derive(Parser)]
#[command(name = "wardend", about = "Service monitoring daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all configured monitors until interrupted.
    Run {
        /// Path to the configuration file.
        #[arg(long, default_value = "warden.toml")]
        config: PathBuf,
    },
    /// Observe every target once and report; no restarts, no alerts.
    Check {
        /// Path to the configuration file.
        #[arg(long, default_value = "warden.toml")]
        config: PathBuf,
    },
    /// Write a starter configuration file.
    Init {
        /// Path to write; an existing file is never overwritten.
        #[arg(long, default_value = "warden.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Check { config } => check(&config).await,
        Command::Init { config } => init(&config),
    }
}

async fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = WardenConfig::from_file(config_path)?;
    init_tracing(&config.log)?;

    info!(config = %config_path.display(), "warden starting");
    preflight(&config).await;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let alerter = Alerter::from_config(&config.alert);
    alerter.info("warden started").await;

    // ── Monitors ───────────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();

    if config.enclave.groups.is_empty() {
        info!("no enclaves configured, enclave monitor disabled");
    } else {
        let monitor = EnclaveMonitor::new(&config.enclave, runner.clone(), alerter.clone());
        handles.push(tokio::spawn(monitor.run(shutdown_rx.clone())));
    }

    if config.process.names.is_empty() {
        info!("no processes configured, process monitor disabled");
    } else {
        let monitor = ProcessMonitor::new(&config.process, runner.clone(), alerter.clone());
        handles.push(tokio::spawn(monitor.run(shutdown_rx.clone())));
    }

    if handles.is_empty() {
        warn!("nothing to monitor; both monitors are disabled");
    }

    // ── Wait for shutdown ──────────────────────────────────────

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = sigterm.recv() => info!("terminate signal received"),
    }

    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }

    info!("warden stopped");
    Ok(())
}

/// Warn up front about host commands the configured monitors will need.
async fn preflight(config: &WardenConfig) {
    if !config.enclave.groups.is_empty() {
        for command in ["kurtosis", "docker"] {
            if !command_available(command).await {
                warn!(%command, "command not found on PATH");
            }
        }
    }
    if !config.process.names.is_empty() && !command_available("pgrep").await {
        warn!(command = "pgrep", "command not found on PATH");
    }
}

/// One observation pass over everything in the config.
///
/// Exits non-zero when anything is stopped or down, so it works as a
/// health check in scripts.
async fn check(config_path: &Path) -> anyhow::Result<()> {
    let config = WardenConfig::from_file(config_path)?;
    init_tracing(&config.log)?;

    let runner = SystemRunner;
    let mut problems = 0usize;

    for group in &config.enclave.groups {
        let records = warden_enclave::fetch_services(&runner, group)
            .await
            .with_context(|| format!("inspect of enclave {group} failed"))?;
        let observation = GroupObservation::from_records(group, records);
        println!(
            "enclave {group}: {} services, {} running, {} stopped",
            observation.total,
            observation.running,
            observation.stopped.len()
        );
        for service in &observation.stopped {
            println!("  STOPPED {} ({})", service.name, service.uuid);
            problems += 1;
        }
    }

    for name in &config.process.names {
        if warden_process::is_running(&runner, name).await? {
            let details = warden_process::process_details(&runner, name).await?;
            println!("process {name}: running ({} matched)", details.len());
            for detail in details {
                println!(
                    "  pid {} user {} cpu {}% mem {}% {}",
                    detail.pid, detail.user, detail.cpu, detail.memory, detail.command
                );
            }
        } else {
            println!("process {name}: not running");
            problems += 1;
        }
    }

    if problems > 0 {
        bail!("{problems} problem(s) found");
    }
    println!("all monitored targets healthy");
    Ok(())
}

fn init(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        bail!("refusing to overwrite {}", config_path.display());
    }

    let rendered = WardenConfig::scaffold().to_toml_string()?;
    let content = format!(
        "# warden configuration\n\
         #\n\
         # [enclave]  enclaves to watch via `kurtosis enclave inspect`\n\
         # [process]  process names to probe via `pgrep -f`\n\
         # [alert]    webhook channels (dingtalk or generic)\n\
         \n\
         {rendered}"
    );
    std::fs::write(config_path, content)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("wrote {}", config_path.display());
    Ok(())
}

/// Route logs to stdout, optionally teeing into the configured file.
fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log.level));

    match &log.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file).and(std::io::stdout))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
