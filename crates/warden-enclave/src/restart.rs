//! Bounded restart bookkeeping and the docker restart path.
//!
//! Kurtosis runs each service in a docker container that keeps the
//! service name in its container name, so a stopped service maps back to
//! a container via `docker ps -a` and comes back with `docker start`.

use std::collections::HashMap;

use tracing::debug;
use warden_exec::{CommandRunner, ExecResult};

/// Per-service restart attempt counters.
///
/// Counters key on `group:service` and survive across sweeps until the
/// whole group is observed healthy.
#[derive(Debug)]
pub struct RestartBook {
    counts: HashMap<String, u32>,
    max: u32,
}

/// Outcome of asking the book for another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Attempt granted and counted; `count` is 1-based.
    Attempt { count: u32, max: u32 },
    /// The cap was already reached; no attempt was counted.
    Exhausted { count: u32 },
}

impl RestartBook {
    pub fn new(max: u32) -> Self {
        Self {
            counts: HashMap::new(),
            max,
        }
    }

    /// Claim the next restart attempt for a service.
    ///
    /// The cap is checked before incrementing, so a book with max 3 grants
    /// attempts 1 through 3 and refuses the fourth.
    pub fn begin_attempt(&mut self, group: &str, service: &str) -> RestartDecision {
        let count = self.counts.entry(format!("{group}:{service}")).or_insert(0);
        if *count >= self.max {
            return RestartDecision::Exhausted { count: *count };
        }
        *count += 1;
        RestartDecision::Attempt {
            count: *count,
            max: self.max,
        }
    }

    /// Attempts recorded so far for a service.
    pub fn attempts(&self, group: &str, service: &str) -> u32 {
        self.counts
            .get(&format!("{group}:{service}"))
            .copied()
            .unwrap_or(0)
    }

    /// Clear every counter whose key contains `group`.
    ///
    /// Keys are `group:service`, so a group name that is a substring of
    /// another group's name clears that group's counters as well.
    pub fn reset_group(&mut self, group: &str) -> usize {
        let before = self.counts.len();
        self.counts.retain(|key, _| !key.contains(group));
        before - self.counts.len()
    }
}

/// Find a stopped container for a service via `docker ps -a`.
///
/// Returns `Ok(None)` when no row names the service in a stopped state.
pub async fn find_stopped_container(
    runner: &dyn CommandRunner,
    service: &str,
) -> ExecResult<Option<String>> {
    let listing = runner.run("docker", &["ps", "-a"]).await?;
    let container = select_stopped_container(&listing, service);
    if let Some(id) = &container {
        debug!(%service, container = %id, "found stopped container");
    }
    Ok(container)
}

/// Pick the first `docker ps -a` row that names the service and shows an
/// `Exited` or `Created` status; the container id is the first column.
pub fn select_stopped_container(listing: &str, service: &str) -> Option<String> {
    for line in listing.lines() {
        if !line.contains(service) {
            continue;
        }
        if !line.contains("Exited") && !line.contains("Created") {
            continue;
        }
        if let Some(id) = line.split_whitespace().next() {
            return Some(id.to_string());
        }
    }
    None
}

/// Issue `docker start` for a container.
pub async fn start_container(runner: &dyn CommandRunner, container: &str) -> ExecResult<()> {
    runner.run("docker", &["start", container]).await?;
    Ok(())
}
