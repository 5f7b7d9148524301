//! Domain types for Warden observations.
//!
//! A `ServiceRecord` is one containerized service as reported by a single
//! `kurtosis enclave inspect` pass. Records are rebuilt wholesale on every
//! tick and never mutated; the monitors compare fresh observations against
//! their own private state maps.

use std::fmt;

// ── Service status ────────────────────────────────────────────────

/// Lifecycle status of an observed enclave service.
///
/// Mirrors the four status literals the inspect table prints. Anything
/// else in the status column makes the row unparseable and the row is
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    Starting,
    Stopping,
}

impl ServiceStatus {
    /// Parse one of the four known uppercase literals.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "RUNNING" => Some(Self::Running),
            "STOPPED" => Some(Self::Stopped),
            "STARTING" => Some(Self::Starting),
            "STOPPING" => Some(Self::Stopping),
            _ => None,
        }
    }

    /// The literal as the inspect table prints it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::Starting => "STARTING",
            Self::Stopping => "STOPPING",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Service record ────────────────────────────────────────────────

/// One service instance observed inside an enclave at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Hexadecimal identifier from the first table column.
    pub uuid: String,
    /// Service name as registered in the enclave.
    pub name: String,
    pub status: ServiceStatus,
}

// ── Group observation ─────────────────────────────────────────────

/// Per-tick summary of one enclave group's parsed service table.
///
/// The comparator works from this summary: stopped records drive
/// remediation, and a group with zero stopped and at least one running
/// service counts as fully healthy (which resets restart counters).
#[derive(Debug, Clone)]
pub struct GroupObservation {
    /// Configured group (enclave) name.
    pub group: String,
    /// Total parsed records, including transitional statuses.
    pub total: usize,
    /// Count of RUNNING records.
    pub running: usize,
    /// The STOPPED records themselves; each one alerts and may be remediated.
    pub stopped: Vec<ServiceRecord>,
}

impl GroupObservation {
    /// Summarize a freshly parsed record set for `group`.
    pub fn from_records(group: &str, records: Vec<ServiceRecord>) -> Self {
        let total = records.len();
        let running = records
            .iter()
            .filter(|r| r.status == ServiceStatus::Running)
            .count();
        let stopped = records
            .into_iter()
            .filter(|r| r.status == ServiceStatus::Stopped)
            .collect();
        Self {
            group: group.to_string(),
            total,
            running,
            stopped,
        }
    }

    /// No services were parsed at all (skip the tick for this group).
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Zero stopped services and at least one running one.
    ///
    /// This is the condition that clears restart counters for the group.
    /// A group of only STARTING/STOPPING records is neither healthy nor
    /// actionable.
    pub fn all_healthy(&self) -> bool {
        self.stopped.is_empty() && self.running > 0
    }
}
