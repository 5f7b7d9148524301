//! Alert sink trait and the fan-out handle the monitors hold.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use warden_core::AlertConfig;

use crate::webhook::WebhookSink;

/// Alert severity. Transitions and remediation outcomes are warnings;
/// startup and informational notices are info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors a sink can report. The `Alerter` logs these and moves on.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The channel accepted the request but rejected the message
    /// (dingtalk errcode != 0).
    #[error("channel rejected message (code {code}): {message}")]
    Rejected { code: i64, message: String },
}

/// One alert delivery channel.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Channel name, for delivery-failure logs.
    fn name(&self) -> &str;

    async fn send(&self, severity: Severity, message: &str) -> Result<(), AlertError>;
}

struct Inner {
    tags: Vec<String>,
    sinks: Vec<Box<dyn AlertSink>>,
}

/// Cheap-to-clone handle the monitors emit alerts through.
///
/// With no sinks configured, alerts still show up in the log stream (the
/// monitors log every transition independently) but go nowhere else.
#[derive(Clone)]
pub struct Alerter {
    inner: Arc<Inner>,
}

impl Alerter {
    pub fn new(tags: Vec<String>, sinks: Vec<Box<dyn AlertSink>>) -> Self {
        Self {
            inner: Arc::new(Inner { tags, sinks }),
        }
    }

    /// Build webhook sinks for every configured channel.
    pub fn from_config(config: &AlertConfig) -> Self {
        let sinks = config
            .channels
            .iter()
            .map(|(name, channel)| {
                Box::new(WebhookSink::new(name, channel.clone())) as Box<dyn AlertSink>
            })
            .collect();
        Self::new(config.tags.clone(), sinks)
    }

    /// An alerter with no channels, for one-shot commands and tests.
    pub fn disabled() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub async fn info(&self, message: &str) {
        self.notify(Severity::Info, message).await;
    }

    pub async fn warn(&self, message: &str) {
        self.notify(Severity::Warn, message).await;
    }

    /// Fan the message out to every sink, in order, best-effort.
    async fn notify(&self, severity: Severity, message: &str) {
        let message = self.decorate(message);
        debug!(%severity, %message, "emitting alert");

        for sink in &self.inner.sinks {
            if let Err(e) = sink.send(severity, &message).await {
                error!(channel = sink.name(), error = %e, "alert delivery failed");
            }
        }
    }

    /// Prefix configured tags: `[devnet] message`.
    fn decorate(&self, message: &str) -> String {
        if self.inner.tags.is_empty() {
            return message.to_string();
        }
        let prefix: String = self
            .inner
            .tags
            .iter()
            .map(|t| format!("[{t}]"))
            .collect();
        format!("{prefix} {message}")
    }
}
