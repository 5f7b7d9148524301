//! `kurtosis enclave inspect` output parsing.
//!
//! The inspect report is human-oriented text: a preamble describing the
//! enclave, then `==`-framed sections, one of which is the "User Services"
//! table. Only that table matters here. Parsing is staged: find the
//! section marker, find the table header, then read rows until a divider
//! or end of input.

use tracing::debug;
use warden_core::{ServiceRecord, ServiceStatus};
use warden_exec::{CommandRunner, ExecResult};

/// Marker line that opens the service table section.
const SERVICE_SECTION: &str = "User Services";

/// Inspect one enclave and return its service table.
pub async fn fetch_services(
    runner: &dyn CommandRunner,
    group: &str,
) -> ExecResult<Vec<ServiceRecord>> {
    let output = runner.run("kurtosis", &["enclave", "inspect", group]).await?;
    let services = parse_services(&output);
    debug!(%group, count = services.len(), "parsed enclave services");
    Ok(services)
}

/// Extract service rows from an inspect report.
///
/// Returns an empty list when the report has no "User Services" section.
/// Rows that do not look like service rows (wrapped port columns, stray
/// text) are skipped rather than treated as errors.
pub fn parse_services(output: &str) -> Vec<ServiceRecord> {
    let mut services = Vec::new();
    let mut in_section = false;
    let mut header_seen = false;

    for raw in output.lines() {
        let line = raw.trim();

        if !in_section {
            if line.contains(SERVICE_SECTION) {
                in_section = true;
            }
            continue;
        }

        if !header_seen {
            if line.contains("UUID") && line.contains("Name") && line.contains("Status") {
                header_seen = true;
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }
        // A divider line opens the next section and ends this one.
        if line.contains("==") {
            break;
        }

        if let Some(service) = parse_service_row(line) {
            services.push(service);
        }
    }

    services
}

/// Parse one table row: `UUID  Name  Ports  Status`.
///
/// The ports column wraps and contains arbitrary tokens, so the status is
/// taken from the rightmost token that is a status literal. Wrapped
/// continuation lines fail the UUID check and fall out here.
fn parse_service_row(line: &str) -> Option<ServiceRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }
    if !is_service_uuid(tokens[0]) {
        return None;
    }
    let status = tokens[2..]
        .iter()
        .rev()
        .find_map(|token| ServiceStatus::parse(token))?;

    Some(ServiceRecord {
        uuid: tokens[0].to_string(),
        name: tokens[1].to_string(),
        status,
    })
}

/// Service UUIDs render as lowercase hex in the first column.
fn is_service_uuid(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
