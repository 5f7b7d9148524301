//! Process monitor — watches host processes by name and alerts on
//! presence transitions.
//!
//! Presence comes from `pgrep -f`, which exits non-zero when nothing
//! matches; that is a normal answer, not a failure. Alerts fire only
//! when a process changes state (or is first seen down), so a process
//! that stays down raises one alert, not one per sweep.

pub mod monitor;
pub mod probe;

pub use monitor::{ProcessMonitor, ProcessTransition};
pub use probe::{ProcessDetail, is_running, parse_process_details, process_details};
