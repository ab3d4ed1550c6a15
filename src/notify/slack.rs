//! Slack Web API notifier.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Attachment, Notifier, NotifyError};
use crate::config::SlackConfig;
use crate::state::MessageRef;

/// Notifier posting to the Slack Web API (`chat.postMessage`/`chat.update`).
pub struct SlackNotifier {
    http: reqwest::Client,
    token: String,
    api_url: String,
    username: String,
    icon_emoji: String,
}

/// The Slack response envelope; `ts`/`channel` are present on success.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            icon_emoji: config.icon_emoji.clone(),
        }
    }

    async fn call(
        &self,
        method: &str,
        payload: serde_json::Value,
    ) -> Result<SlackResponse, NotifyError> {
        let url = format!("{}/{}", self.api_url, method);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        let body: SlackResponse = response.json().await?;
        if !body.ok {
            return Err(NotifyError::Api(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(body)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post(
        &self,
        channel: &str,
        attachment: Attachment,
    ) -> Result<MessageRef, NotifyError> {
        debug!(channel, "posting call notification");
        let body = self
            .call(
                "chat.postMessage",
                json!({
                    "channel": channel,
                    "username": self.username,
                    "icon_emoji": self.icon_emoji,
                    "attachments": [attachment],
                }),
            )
            .await?;
        match (body.channel, body.ts) {
            (Some(channel), Some(ts)) => Ok(MessageRef { channel, ts }),
            _ => Err(NotifyError::Api("response missing ts/channel".to_string())),
        }
    }

    async fn update(
        &self,
        message: &MessageRef,
        attachment: Attachment,
    ) -> Result<(), NotifyError> {
        debug!(channel = %message.channel, ts = %message.ts, "updating call notification");
        self.call(
            "chat.update",
            json!({
                "channel": message.channel,
                "ts": message.ts,
                "username": self.username,
                "icon_emoji": self.icon_emoji,
                "attachments": [attachment],
            }),
        )
        .await?;
        Ok(())
    }
}
