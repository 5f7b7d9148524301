//! Command runner trait and the host implementation.

use std::process::ExitStatus;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Result type alias for command execution.
pub type ExecResult<T> = Result<T, ExecError>;

/// Errors from invoking an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The command could not be started (missing binary, permissions).
    #[error("failed to invoke {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited non-zero.
    ///
    /// For lookup-style commands (pgrep) this is the ordinary "not found"
    /// signal, not a fault.
    #[error("{program} exited with {status}: {stderr}")]
    NonZero {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl ExecError {
    /// The command was invoked but reported failure.
    pub fn is_non_zero(&self) -> bool {
        matches!(self, ExecError::NonZero { .. })
    }
}

/// Capability the monitors consume: run a command, get trimmed stdout.
///
/// No timeout is applied; a command that hangs hangs its caller.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> ExecResult<String>;
}

/// Runs commands on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> ExecResult<String> {
        debug!(%program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| ExecError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ExecError::NonZero {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Check whether `program` resolves on `$PATH`.
///
/// Used at startup to warn about missing external tools before the first
/// tick trips over them.
pub async fn command_available(program: &str) -> bool {
    match Command::new("which").arg(program).output().await {
        Ok(output) => {
            output.status.success()
                && !String::from_utf8_lossy(&output.stdout).trim().is_empty()
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_trimmed_stdout() {
        let out = SystemRunner.run("echo", &["hello world"]).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn non_zero_exit_is_typed() {
        let err = SystemRunner.run("false", &[]).await.unwrap_err();
        assert!(err.is_non_zero());
        match err {
            ExecError::NonZero { program, status, .. } => {
                assert_eq!(program, "false");
                assert!(!status.success());
            }
            other => panic!("expected NonZero, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let err = SystemRunner
            .run("warden-no-such-binary", &[])
            .await
            .unwrap_err();
        assert!(!err.is_non_zero());
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[tokio::test]
    async fn stderr_is_captured_on_failure() {
        // `ls` on a missing path fails and complains on stderr.
        let err = SystemRunner
            .run("ls", &["/warden-definitely-missing-path"])
            .await
            .unwrap_err();
        match err {
            ExecError::NonZero { stderr, .. } => assert!(!stderr.is_empty()),
            other => panic!("expected NonZero, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn command_available_finds_sh() {
        assert!(command_available("sh").await);
    }

    #[tokio::test]
    async fn command_available_rejects_missing() {
        assert!(!command_available("warden-no-such-binary").await);
    }
}
