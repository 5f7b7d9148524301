//! warden-exec — external command capability for Warden.
//!
//! Every observation Warden makes comes from an external tool: `kurtosis`
//! for enclave inspection, `docker` for container lookup and restarts,
//! `pgrep`/`ps` for process checks. This crate wraps "run a command, get
//! stdout or a typed failure" behind the [`CommandRunner`] trait so the
//! monitors can be driven by a scripted runner in tests.
//!
//! The error taxonomy matters to callers: [`ExecError::Spawn`] means the
//! command could not be invoked at all, while [`ExecError::NonZero`] means
//! it ran and reported failure. A pgrep miss is the latter, and is a valid
//! "process absent" signal rather than an error.

pub mod runner;

pub use runner::{CommandRunner, ExecError, ExecResult, SystemRunner, command_available};
