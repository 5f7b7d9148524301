//! Webhook delivery sink.
//!
//! Speaks two dialects: the DingTalk robot API (text msgtype, optional
//! `@` mentions, optional HMAC-SHA256 request signing) and a generic
//! JSON POST for anything that accepts `{"severity", "message"}`.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

use warden_core::{ChannelConfig, ChannelKind};

use crate::sink::{AlertError, AlertSink, Severity};

/// POSTs alerts to a configured webhook channel.
pub struct WebhookSink {
    name: String,
    channel: ChannelConfig,
    client: reqwest::Client,
}

/// DingTalk's response envelope; errcode 0 means accepted.
#[derive(Debug, Deserialize)]
struct RobotAck {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl WebhookSink {
    pub fn new(name: &str, channel: ChannelConfig) -> Self {
        Self {
            name: name.to_string(),
            channel,
            client: reqwest::Client::new(),
        }
    }

    fn payload(&self, severity: Severity, message: &str) -> serde_json::Value {
        match self.channel.kind {
            ChannelKind::Dingtalk => serde_json::json!({
                "msgtype": "text",
                "text": { "content": message },
                "at": {
                    "atMobiles": self.channel.at_mobiles,
                    "isAtAll": self.channel.at_all,
                },
            }),
            ChannelKind::Generic => serde_json::json!({
                "severity": severity.as_str(),
                "message": message,
            }),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, severity: Severity, message: &str) -> Result<(), AlertError> {
        let mut request = self
            .client
            .post(&self.channel.webhook)
            .json(&self.payload(severity, message));

        if let Some(secret) = &self.channel.secret {
            let timestamp = epoch_millis();
            request = request.query(&signed_query(secret, timestamp));
        }

        debug!(channel = %self.name, %severity, "posting alert webhook");

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if self.channel.kind == ChannelKind::Dingtalk {
            let ack: RobotAck = response.json().await?;
            if ack.errcode != 0 {
                return Err(AlertError::Rejected {
                    code: ack.errcode,
                    message: ack.errmsg,
                });
            }
        }

        Ok(())
    }
}

/// Query parameters for a signed robot request.
fn signed_query(secret: &str, timestamp_ms: i64) -> [(&'static str, String); 2] {
    [
        ("timestamp", timestamp_ms.to_string()),
        ("sign", dingtalk_sign(secret, timestamp_ms)),
    ]
}

/// DingTalk signature: base64(HMAC-SHA256(secret, "{timestamp}\n{secret}")).
fn dingtalk_sign(secret: &str, timestamp_ms: i64) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac-sha256 accepts keys of any length");
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
