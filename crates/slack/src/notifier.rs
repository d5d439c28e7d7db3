use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use boardbot_core::config::SlackConfig;

use crate::blocks::Block;

const SLACK_API_BASE_URL: &str = "https://slack.com/api";

/// Outcome of one delivery attempt. Delivery failures are values, not
/// errors; callers log and move on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub ok: bool,
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn delivered() -> Self {
        Self { ok: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { ok: false, error: Some(error.into()) }
    }
}

/// Posts one message to a channel, optionally threaded and with Block Kit
/// formatting. Stateless; safe to share across turns.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        text: &str,
        channel_id: &str,
        blocks: Option<&[Block]>,
        thread_ts: Option<&str>,
    ) -> DeliveryReceipt;
}

pub struct HttpNotifier {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

impl HttpNotifier {
    pub fn new(config: &SlackConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: SLACK_API_BASE_URL.to_string(),
            bot_token: config.bot_token.clone(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(
        &self,
        text: &str,
        channel_id: &str,
        blocks: Option<&[Block]>,
        thread_ts: Option<&str>,
    ) -> DeliveryReceipt {
        let mut body = json!({
            "channel": channel_id,
            "text": text,
        });
        if let Some(blocks) = blocks {
            body["blocks"] = match serde_json::to_value(blocks) {
                Ok(value) => value,
                Err(error) => {
                    warn!(error = %error, "failed to serialize message blocks");
                    return DeliveryReceipt::failed(format!("block serialization: {error}"));
                }
            };
        }
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }

        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                warn!(channel_id, error = %error, "chat.postMessage request failed");
                return DeliveryReceipt::failed(error.to_string());
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(channel_id, status = status.as_u16(), "chat.postMessage returned an error status");
            return DeliveryReceipt::failed(format!("HTTP {status}"));
        }

        match response.json::<PostMessageResponse>().await {
            Ok(parsed) if parsed.ok => DeliveryReceipt::delivered(),
            Ok(parsed) => {
                let reason = parsed.error.unwrap_or_else(|| "unknown".to_string());
                warn!(channel_id, reason, "slack rejected chat.postMessage");
                DeliveryReceipt::failed(reason)
            }
            Err(error) => {
                warn!(channel_id, error = %error, "chat.postMessage response was unreadable");
                DeliveryReceipt::failed(error.to_string())
            }
        }
    }
}

/// One recorded delivery, for assertions in tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub text: String,
    pub channel_id: String,
    pub thread_ts: Option<String>,
    pub block_count: usize,
}

/// In-memory notifier that records every send and always reports success.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        text: &str,
        channel_id: &str,
        blocks: Option<&[Block]>,
        thread_ts: Option<&str>,
    ) -> DeliveryReceipt {
        let mut sent = self.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        sent.push(SentMessage {
            text: text.to_string(),
            channel_id: channel_id.to_string(),
            thread_ts: thread_ts.map(str::to_string),
            block_count: blocks.map(<[Block]>::len).unwrap_or(0),
        });
        DeliveryReceipt::delivered()
    }
}
