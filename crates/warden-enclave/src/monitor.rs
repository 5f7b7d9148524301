//! Enclave sweep loop.
//!
//! One task owns all configured enclaves and sweeps them in order every
//! tick. A sweep that cannot inspect an enclave logs and skips it; the
//! restart counters only change on sweeps that actually observed the
//! group.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use warden_alert::Alerter;
use warden_core::{EnclaveConfig, GroupObservation, ServiceRecord};
use warden_exec::CommandRunner;

use crate::inspect::fetch_services;
use crate::restart::{RestartBook, RestartDecision, find_stopped_container, start_container};

/// Pause after a successful `docker start` so the service can settle
/// before the next sweep sees it.
const RESTART_SETTLE: Duration = Duration::from_secs(5);

/// Watches configured enclaves and restarts stopped services.
pub struct EnclaveMonitor {
    groups: Vec<String>,
    interval: Duration,
    runner: Arc<dyn CommandRunner>,
    alerter: Alerter,
    book: RestartBook,
    settle: Duration,
}

impl EnclaveMonitor {
    pub fn new(config: &EnclaveConfig, runner: Arc<dyn CommandRunner>, alerter: Alerter) -> Self {
        Self {
            groups: config.groups.clone(),
            interval: config.interval(),
            runner,
            alerter,
            book: RestartBook::new(config.max_restart_attempts),
            settle: RESTART_SETTLE,
        }
    }

    /// Override the post-restart settle pause (for testing).
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Run sweeps until the shutdown signal flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            groups = ?self.groups,
            interval_secs = self.interval.as_secs(),
            "enclave monitor starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.changed() => {
                    info!("enclave monitor shutting down");
                    break;
                }
            }
        }
    }

    /// Inspect every configured enclave once.
    pub async fn sweep(&mut self) {
        for group in self.groups.clone() {
            self.observe_group(&group).await;
        }
    }

    async fn observe_group(&mut self, group: &str) {
        info!(%group, "inspecting enclave");

        let records = match fetch_services(self.runner.as_ref(), group).await {
            Ok(records) => records,
            Err(e) => {
                error!(%group, error = %e, "enclave inspect failed");
                return;
            }
        };

        let observation = GroupObservation::from_records(group, records);
        if observation.is_empty() {
            warn!(%group, "no services reported");
            return;
        }

        for service in &observation.stopped {
            warn!(%group, service = %service.name, uuid = %service.uuid, "service stopped");
            self.alerter
                .warn(&format!(
                    "enclave {group}: service {} is stopped",
                    service.name
                ))
                .await;
        }

        info!(
            %group,
            total = observation.total,
            running = observation.running,
            stopped = observation.stopped.len(),
            "enclave sweep complete"
        );

        for service in &observation.stopped {
            self.remediate(group, service).await;
        }

        if observation.all_healthy() {
            let cleared = self.book.reset_group(group);
            if cleared > 0 {
                info!(%group, cleared, "all services running, restart counters cleared");
            }
        }
    }

    async fn remediate(&mut self, group: &str, service: &ServiceRecord) {
        match self.book.begin_attempt(group, &service.name) {
            RestartDecision::Exhausted { count } => {
                error!(
                    %group,
                    service = %service.name,
                    attempts = count,
                    "restart attempts exhausted"
                );
                self.alerter
                    .warn(&format!(
                        "enclave {group}: giving up on service {} after {count} failed restarts",
                        service.name
                    ))
                    .await;
            }
            RestartDecision::Attempt { count, max } => {
                info!(
                    %group,
                    service = %service.name,
                    attempt = count,
                    max,
                    "restarting service"
                );
                self.alerter
                    .warn(&format!(
                        "enclave {group}: restarting service {} (attempt {count}/{max})",
                        service.name
                    ))
                    .await;

                if self.try_restart(service).await {
                    info!(%group, service = %service.name, "service restarted");
                    self.alerter
                        .info(&format!(
                            "enclave {group}: service {} restarted",
                            service.name
                        ))
                        .await;
                    tokio::time::sleep(self.settle).await;
                } else {
                    error!(
                        %group,
                        service = %service.name,
                        attempt = count,
                        max,
                        "restart failed"
                    );
                    self.alerter
                        .warn(&format!(
                            "enclave {group}: restart of service {} failed (attempt {count}/{max})",
                            service.name
                        ))
                        .await;
                }
            }
        }
    }

    /// Map the service back to a container and start it.
    async fn try_restart(&self, service: &ServiceRecord) -> bool {
        let container =
            match find_stopped_container(self.runner.as_ref(), &service.name).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    error!(service = %service.name, "no stopped container found");
                    return false;
                }
                Err(e) => {
                    error!(service = %service.name, error = %e, "container lookup failed");
                    return false;
                }
            };

        info!(service = %service.name, container = %container, "starting container");
        if let Err(e) = start_container(self.runner.as_ref(), &container).await {
            error!(container = %container, error = %e, "docker start failed");
            return false;
        }
        true
    }
}
