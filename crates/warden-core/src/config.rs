//! warden.toml configuration parser.
//!
//! All sections are optional; a missing section takes its defaults, and an
//! empty `groups`/`names` list disables that monitor entirely. Validation
//! is separate from parsing so the daemon can fail fast with a readable
//! message before any monitor starts.

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub enclave: EnclaveConfig,
    #[serde(default)]
    pub process: ProcessConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

/// Enclave monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnclaveConfig {
    /// Enclave (group) names to inspect each tick. Empty disables the monitor.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Poll interval in seconds.
    #[serde(default = "default_enclave_interval")]
    pub interval_secs: u64,
    /// Consecutive restart attempts allowed per service before giving up.
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
}

/// Process monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Process names to probe each tick (pgrep patterns). Empty disables
    /// the monitor.
    #[serde(default)]
    pub names: Vec<String>,
    /// Poll interval in seconds.
    #[serde(default = "default_process_interval")]
    pub interval_secs: u64,
}

/// Log sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base log level (overridable via RUST_LOG).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, opened in append mode and teed with stdout.
    #[serde(default)]
    pub file: Option<String>,
}

/// Alert channel settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Tags prefixed to every alert message, e.g. `[devnet]`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Named delivery channels. Empty means alerts are logged only.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

/// One alert delivery channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub kind: ChannelKind,
    /// Webhook URL to POST to.
    pub webhook: String,
    /// Signing secret, for dingtalk robots with signature verification
    /// enabled.
    #[serde(default)]
    pub secret: Option<String>,
    /// Phone numbers to @-mention (dingtalk).
    #[serde(default)]
    pub at_mobiles: Vec<String>,
    /// Mention everyone in the group (dingtalk).
    #[serde(default)]
    pub at_all: bool,
}

/// Payload dialect for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// DingTalk robot webhook (text msgtype, optional HMAC signing).
    Dingtalk,
    /// Plain `{"severity": …, "message": …}` JSON POST.
    Generic,
}

fn default_enclave_interval() -> u64 {
    60
}

fn default_process_interval() -> u64 {
    30
}

fn default_max_restart_attempts() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            interval_secs: default_enclave_interval(),
            max_restart_attempts: default_max_restart_attempts(),
        }
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            interval_secs: default_process_interval(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl EnclaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl ProcessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl WardenConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: WardenConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the monitors cannot run with.
    ///
    /// A zero interval would make the tick timer degenerate, and a channel
    /// without a webhook can never deliver.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.enclave.interval_secs == 0 {
            bail!("enclave.interval_secs must be positive");
        }
        if self.process.interval_secs == 0 {
            bail!("process.interval_secs must be positive");
        }
        for (name, channel) in &self.alert.channels {
            if channel.webhook.trim().is_empty() {
                bail!("alert channel '{name}' has an empty webhook URL");
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a minimal configuration with both monitors disabled.
    ///
    /// `wardend init` writes this (plus a commented walkthrough) so a new
    /// deployment starts from a file that parses and validates.
    pub fn scaffold() -> Self {
        WardenConfig {
            enclave: EnclaveConfig::default(),
            process: ProcessConfig::default(),
            log: LogConfig {
                level: "info".to_string(),
                file: Some("warden.log".to_string()),
            },
            alert: AlertConfig::default(),
        }
    }
}
