//! warden-alert — alert emission for Warden.
//!
//! The monitors report every state transition and remediation outcome
//! through an [`Alerter`], which prefixes configured tags and fans the
//! message out to each configured channel in order. Delivery is
//! best-effort: a failing channel is logged and skipped, and nothing in
//! the monitors waits on or retries delivery.
//!
//! # Architecture
//!
//! ```text
//! monitor ── Alerter::warn("enclave devnet service web stopped")
//!              ├── tag prefix: "[devnet] enclave devnet service web …"
//!              ├── WebhookSink "ops"      (dingtalk payload, signed)
//!              └── WebhookSink "fallback" (generic JSON payload)
//! ```
//!
//! Sinks run inline and in declaration order so a recording sink in tests
//! observes the exact emission sequence.

pub mod sink;
pub mod webhook;

pub use sink::{AlertError, AlertSink, Alerter, Severity};
pub use webhook::WebhookSink;
