//! Host process probes built on `pgrep` and `ps`.

use tracing::debug;
use warden_exec::{CommandRunner, ExecResult};

/// Check whether any process matches `name`.
///
/// Uses `pgrep -f`, so the pattern matches against the full command
/// line. A non-zero exit means no match and maps to `Ok(false)`; only a
/// probe that could not run at all is an error.
pub async fn is_running(runner: &dyn CommandRunner, name: &str) -> ExecResult<bool> {
    match runner.run("pgrep", &["-f", name]).await {
        Ok(stdout) => {
            let pids = stdout.trim();
            if pids.is_empty() {
                return Ok(false);
            }
            debug!(process = %name, pids = %pids.replace('\n', ", "), "process present");
            Ok(true)
        }
        Err(e) if e.is_non_zero() => Ok(false),
        Err(e) => Err(e),
    }
}

/// One `ps aux` row for a matched process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDetail {
    pub user: String,
    pub pid: String,
    pub cpu: String,
    pub memory: String,
    pub command: String,
}

/// List `ps aux` rows whose command line mentions `name`.
pub async fn process_details(
    runner: &dyn CommandRunner,
    name: &str,
) -> ExecResult<Vec<ProcessDetail>> {
    let listing = runner.run("ps", &["aux"]).await?;
    Ok(parse_process_details(&listing, name))
}

/// Extract matching rows from a `ps aux` listing.
///
/// Rows mentioning `ps aux` itself are dropped so the probe does not
/// report its own listing command.
pub fn parse_process_details(listing: &str, name: &str) -> Vec<ProcessDetail> {
    let mut details = Vec::new();

    for line in listing.lines() {
        if !line.contains(name) || line.contains("ps aux") {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        // USER PID %CPU %MEM VSZ RSS TTY STAT START TIME COMMAND...
        if fields.len() < 11 {
            continue;
        }
        details.push(ProcessDetail {
            user: fields[0].to_string(),
            pid: fields[1].to_string(),
            cpu: fields[2].to_string(),
            memory: fields[3].to_string(),
            command: fields[10..].join(" "),
        });
    }

    details
}
