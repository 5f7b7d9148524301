//! Enclave monitor — watches Kurtosis enclaves and restarts stopped services.
//!
//! Each sweep inspects every configured enclave, compares the reported
//! service table against the healthy baseline, and walks any stopped
//! service through a bounded restart:
//!
//! ```text
//!   kurtosis enclave inspect <group>
//!        │ parse_services
//!        ▼
//!   GroupObservation ── stopped? ──▶ RestartBook.begin_attempt
//!                                         │ Attempt
//!                                         ▼
//!                      docker ps -a ──▶ docker start <container>
//! ```
//!
//! Restart attempts are counted per `group:service` and capped; a sweep
//! that finds the whole group running clears its counters.

pub mod inspect;
pub mod monitor;
pub mod restart;

pub use inspect::{fetch_services, parse_services};
pub use monitor::EnclaveMonitor;
pub use restart::{RestartBook, RestartDecision};
