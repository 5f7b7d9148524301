//! Multi-sweep remediation scenarios driven through scripted commands.

use std::collections::{HashMap, VecDeque};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use warden_alert::{AlertError, AlertSink, Alerter, Severity};
use warden_core::EnclaveConfig;
use warden_enclave::EnclaveMonitor;
use warden_exec::{CommandRunner, ExecError, ExecResult};

const INSPECT_STOPPED: &str = include_str!("fixtures/inspect_stopped.txt");
const INSPECT_HEALTHY: &str = include_str!("fixtures/inspect_healthy.txt");

const PS_WITH_EXITED: &str = "\
CONTAINER ID   IMAGE               COMMAND            CREATED       STATUS                      PORTS     NAMES
3f1f4a2b9c0d   kurtosistech/core   \"/bin/sh -c run\"   2 hours ago   Up 2 hours                            beacon-node--0214c31a1db2
4fe1d09aa2bb   kurtosis/web:dev    \"/entrypoint.sh\"   2 hours ago   Exited (137) 5 minutes ago            web-service--a99d404716d5
";

const PS_ALL_UP: &str = "\
CONTAINER ID   IMAGE               COMMAND            CREATED       STATUS       PORTS     NAMES
3f1f4a2b9c0d   kurtosistech/core   \"/bin/sh -c run\"   2 hours ago   Up 2 hours             beacon-node--0214c31a1db2
9e8d7c6b5a40   kurtosis/web:dev    \"/entrypoint.sh\"   2 hours ago   Up 1 minute            web-service--a99d404716d5
";

// ── scripted command runner ─────────────────────────────────────────────

/// Replays canned responses keyed by the full command line, in push order.
struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<ExecResult<String>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn push_ok(&self, command: &str, stdout: &str) {
        self.push(command, Ok(stdout.to_string()));
    }

    fn push_failure(&self, command: &str) {
        let program = command.split_whitespace().next().unwrap().to_string();
        self.push(
            command,
            Err(ExecError::NonZero {
                program,
                status: ExitStatus::from_raw(1 << 8),
                stderr: "scripted failure".to_string(),
            }),
        );
    }

    fn push(&self, command: &str, result: ExecResult<String>) {
        self.responses
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(result);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> ExecResult<String> {
        let key = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(key.clone());

        match self
            .responses
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front())
        {
            Some(result) => result,
            None => panic!("no scripted response for: {key}"),
        }
    }
}

// ── recording alert sink ────────────────────────────────────────────────

struct RecordingSink {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AlertSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, severity: Severity, message: &str) -> Result<(), AlertError> {
        self.seen.lock().unwrap().push(format!("{severity}:{message}"));
        Ok(())
    }
}

fn recording_alerter() -> (Alerter, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink { seen: seen.clone() };
    (Alerter::new(Vec::new(), vec![Box::new(sink)]), seen)
}

fn test_config(groups: &[&str], max_restart_attempts: u32) -> EnclaveConfig {
    EnclaveConfig {
        groups: groups.iter().map(|g| g.to_string()).collect(),
        interval_secs: 1,
        max_restart_attempts,
    }
}

// ── scenarios ───────────────────────────────────────────────────────────

#[tokio::test]
async fn stopped_service_is_restarted() {
    let runner = ScriptedRunner::new();
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_STOPPED);
    runner.push_ok("docker ps -a", PS_WITH_EXITED);
    runner.push_ok("docker start 4fe1d09aa2bb", "4fe1d09aa2bb");

    let (alerter, alerts) = recording_alerter();
    let mut monitor = EnclaveMonitor::new(&test_config(&["devnet-1"], 3), runner.clone(), alerter)
        .with_settle(Duration::ZERO);

    monitor.sweep().await;

    assert_eq!(
        runner.calls(),
        vec![
            "kurtosis enclave inspect devnet-1",
            "docker ps -a",
            "docker start 4fe1d09aa2bb",
        ]
    );

    let seen = alerts.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            "warn:enclave devnet-1: service web-service is stopped",
            "warn:enclave devnet-1: restarting service web-service (attempt 1/3)",
            "info:enclave devnet-1: service web-service restarted",
        ]
    );
}

#[tokio::test]
async fn restart_attempts_stop_at_the_cap() {
    let runner = ScriptedRunner::new();
    for _ in 0..4 {
        runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_STOPPED);
    }
    // Each restart succeeds, yet the service shows up stopped again.
    runner.push_ok("docker ps -a", PS_WITH_EXITED);
    runner.push_ok("docker start 4fe1d09aa2bb", "4fe1d09aa2bb");
    runner.push_ok("docker ps -a", PS_WITH_EXITED);
    runner.push_ok("docker start 4fe1d09aa2bb", "4fe1d09aa2bb");

    let (alerter, alerts) = recording_alerter();
    let mut monitor = EnclaveMonitor::new(&test_config(&["devnet-1"], 2), runner.clone(), alerter)
        .with_settle(Duration::ZERO);

    for _ in 0..4 {
        monitor.sweep().await;
    }

    let calls = runner.calls();
    assert_eq!(
        calls
            .iter()
            .filter(|c| c.starts_with("docker start"))
            .count(),
        2
    );
    // The exhausted third and fourth sweeps never touch docker at all.
    assert_eq!(calls.iter().filter(|c| *c == "docker ps -a").count(), 2);

    let seen = alerts.lock().unwrap();
    assert_eq!(
        seen[1],
        "warn:enclave devnet-1: restarting service web-service (attempt 1/2)"
    );
    assert_eq!(
        seen[2],
        "info:enclave devnet-1: service web-service restarted"
    );
    assert_eq!(
        seen[4],
        "warn:enclave devnet-1: restarting service web-service (attempt 2/2)"
    );
    assert_eq!(
        seen[7],
        "warn:enclave devnet-1: giving up on service web-service after 2 failed restarts"
    );
    assert_eq!(
        seen[9],
        "warn:enclave devnet-1: giving up on service web-service after 2 failed restarts"
    );
    // The count stays pinned at the cap.
    assert!(seen.iter().all(|m| !m.contains("attempt 3")));
}

#[tokio::test]
async fn healthy_sweep_resets_the_counters() {
    let runner = ScriptedRunner::new();
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_STOPPED);
    runner.push_ok("docker ps -a", PS_ALL_UP);
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_HEALTHY);
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_STOPPED);
    runner.push_ok("docker ps -a", PS_ALL_UP);

    let (alerter, alerts) = recording_alerter();
    let mut monitor = EnclaveMonitor::new(&test_config(&["devnet-1"], 3), runner.clone(), alerter)
        .with_settle(Duration::ZERO);

    for _ in 0..3 {
        monitor.sweep().await;
    }

    let seen = alerts.lock().unwrap();
    let first_attempts = seen
        .iter()
        .filter(|m| m.contains("restarting service web-service (attempt 1/3)"))
        .count();
    // The healthy sweep wiped the count, so the third sweep starts over.
    assert_eq!(first_attempts, 2);
    assert!(seen.iter().all(|m| !m.contains("(attempt 2/3)")));
}

#[tokio::test]
async fn failed_inspect_skips_the_sweep_and_keeps_counters() {
    let runner = ScriptedRunner::new();
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_STOPPED);
    runner.push_ok("docker ps -a", PS_ALL_UP);
    runner.push_failure("kurtosis enclave inspect devnet-1");
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_STOPPED);
    runner.push_ok("docker ps -a", PS_ALL_UP);

    let (alerter, alerts) = recording_alerter();
    let mut monitor = EnclaveMonitor::new(&test_config(&["devnet-1"], 3), runner.clone(), alerter)
        .with_settle(Duration::ZERO);

    monitor.sweep().await;
    let after_first = alerts.lock().unwrap().len();

    // Inspect failure: no alerts, no docker traffic, counters untouched.
    monitor.sweep().await;
    assert_eq!(alerts.lock().unwrap().len(), after_first);

    monitor.sweep().await;
    let seen = alerts.lock().unwrap();
    assert!(
        seen.iter()
            .any(|m| m.contains("restarting service web-service (attempt 2/3)"))
    );
}

#[tokio::test]
async fn empty_enclave_is_left_alone() {
    let report = "\
========================================== User Services ==========================================
UUID           Name          Ports     Status
";
    let runner = ScriptedRunner::new();
    runner.push_ok("kurtosis enclave inspect devnet-1", report);

    let (alerter, alerts) = recording_alerter();
    let mut monitor = EnclaveMonitor::new(&test_config(&["devnet-1"], 3), runner.clone(), alerter)
        .with_settle(Duration::ZERO);

    monitor.sweep().await;

    assert_eq!(runner.calls(), vec!["kurtosis enclave inspect devnet-1"]);
    assert!(alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn every_group_is_swept_in_order() {
    let runner = ScriptedRunner::new();
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_HEALTHY);
    runner.push_ok("kurtosis enclave inspect devnet-2", INSPECT_STOPPED);
    runner.push_ok("docker ps -a", PS_WITH_EXITED);
    runner.push_ok("docker start 4fe1d09aa2bb", "");

    let (alerter, alerts) = recording_alerter();
    let mut monitor = EnclaveMonitor::new(
        &test_config(&["devnet-1", "devnet-2"], 3),
        runner.clone(),
        alerter,
    )
    .with_settle(Duration::ZERO);

    monitor.sweep().await;

    let calls = runner.calls();
    assert_eq!(calls[0], "kurtosis enclave inspect devnet-1");
    assert_eq!(calls[1], "kurtosis enclave inspect devnet-2");

    let seen = alerts.lock().unwrap();
    assert!(seen.iter().all(|m| m.contains("devnet-2")));
    assert!(!seen.is_empty());
}

#[tokio::test]
async fn first_sweep_runs_at_startup() {
    let runner = ScriptedRunner::new();
    // Two responses in case a second tick lands before the shutdown.
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_HEALTHY);
    runner.push_ok("kurtosis enclave inspect devnet-1", INSPECT_HEALTHY);

    let (alerter, _alerts) = recording_alerter();
    let monitor = EnclaveMonitor::new(&test_config(&["devnet-1"], 3), runner.clone(), alerter);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(monitor.run(shutdown_rx));

    // The ticker fires immediately, well before one full period elapses.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("monitor loop did not stop")
        .unwrap();

    assert!(!runner.calls().is_empty());
}

#[tokio::test]
async fn shutdown_signal_stops_the_loop() {
    let runner = ScriptedRunner::new();
    let (alerter, _alerts) = recording_alerter();
    // No groups configured: sweeps are no-ops, so no scripting needed.
    let monitor = EnclaveMonitor::new(&test_config(&[], 3), runner, alerter);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = tokio::spawn(monitor.run(shutdown_rx));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("monitor loop did not stop")
        .unwrap();
}
