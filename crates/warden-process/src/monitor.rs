//! Process sweep loop and transition tracking.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use warden_alert::Alerter;
use warden_core::ProcessConfig;
use warden_exec::CommandRunner;

use crate::probe::is_running;

/// How a probe result relates to the last recorded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessTransition {
    /// Down now, and either up before or never seen.
    BecameDown,
    /// Down now and down before.
    StillDown,
    /// Up now after being down.
    BecameUp,
    /// Up now, nothing to report.
    StillUp,
}

impl ProcessTransition {
    /// Classify a probe against the previous state, `None` on first sight.
    pub fn classify(last: Option<bool>, running: bool) -> Self {
        match (last, running) {
            (Some(false), true) => Self::BecameUp,
            (_, true) => Self::StillUp,
            (Some(false), false) => Self::StillDown,
            (_, false) => Self::BecameDown,
        }
    }
}

/// Watches configured process names and alerts on state changes.
pub struct ProcessMonitor {
    names: Vec<String>,
    interval: Duration,
    runner: Arc<dyn CommandRunner>,
    alerter: Alerter,
    /// Last probe result per process name.
    states: HashMap<String, bool>,
}

impl ProcessMonitor {
    pub fn new(config: &ProcessConfig, runner: Arc<dyn CommandRunner>, alerter: Alerter) -> Self {
        Self {
            names: config.names.clone(),
            interval: config.interval(),
            runner,
            alerter,
            states: HashMap::new(),
        }
    }

    /// Run sweeps until the shutdown signal flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            processes = ?self.names,
            interval_secs = self.interval.as_secs(),
            "process monitor starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.changed() => {
                    info!("process monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Probe every configured process once.
    pub async fn sweep(&mut self) {
        for name in self.names.clone() {
            self.observe_process(&name).await;
        }
    }

    async fn observe_process(&mut self, name: &str) {
        let running = match is_running(self.runner.as_ref(), name).await {
            Ok(running) => running,
            Err(e) => {
                // Probe could not run; keep the last state so the next good
                // probe still sees the real transition.
                error!(process = %name, error = %e, "process probe failed");
                return;
            }
        };

        let last = self.states.get(name).copied();
        self.states.insert(name.to_string(), running);

        match ProcessTransition::classify(last, running) {
            ProcessTransition::BecameDown => {
                error!(process = %name, "process stopped running");
                self.alerter
                    .warn(&format!("process {name} stopped running"))
                    .await;
            }
            ProcessTransition::StillDown => {
                error!(process = %name, "process still not running");
            }
            ProcessTransition::BecameUp => {
                info!(process = %name, "process recovered");
                self.alerter
                    .info(&format!("process {name} recovered"))
                    .await;
            }
            ProcessTransition::StillUp => {
                info!(process = %name, "process running");
            }
        }
    }
}
