//! warden-core — shared types and configuration for Warden.
//!
//! Warden watches two kinds of workloads: Kurtosis enclaves (named groups
//! of containerized services) and bare OS processes. This crate holds the
//! vocabulary both monitors speak (observed service records and per-tick
//! group summaries) plus the `warden.toml` configuration surface.
//!
//! Observations are ephemeral: every monitor tick rebuilds its records from
//! the raw output of an external status command and compares them against
//! the previous tick. Nothing here is persisted.

pub mod config;
pub mod types;

pub use config::{
    AlertConfig, ChannelConfig, ChannelKind, EnclaveConfig, LogConfig, ProcessConfig,
    WardenConfig,
};
pub use types::{GroupObservation, ServiceRecord, ServiceStatus};
