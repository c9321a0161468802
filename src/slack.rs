use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Config, SlackApiResponse, SlackPostMessage};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Slack notifications are not configured")]
    Disabled,
    #[error("Failed to send Slack request: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Slack API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Slack API rejected message: {0}")]
    Api(String),
}

/// Destination for compliance messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Whether messages can be delivered right now. When false the caller buffers them.
    fn enabled(&self) -> bool;

    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Posts messages to a Slack channel through `chat.postMessage`.
pub struct SlackNotifier {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    channel: Option<String>,
}

impl SlackNotifier {
    pub fn new(api_url: &str, token: Option<String>, channel: Option<String>) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            channel,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, NotifyError> {
        Self::new(&cfg.slack_api_url, cfg.slack_token.clone(), cfg.slack_channel.clone())
    }
}

#[async_trait]
impl NotificationSink for SlackNotifier {
    fn enabled(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
        set(&self.token) && set(&self.channel)
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let (Some(token), Some(channel)) = (self.token.as_deref(), self.channel.as_deref()) else {
            return Err(NotifyError::Disabled);
        };
        if !self.enabled() {
            return Err(NotifyError::Disabled);
        }

        let res = self
            .http
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(token)
            .json(&SlackPostMessage { channel, text })
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status: status.as_u16(), body });
        }

        let reply: SlackApiResponse = res.json().await?;
        if !reply.ok {
            return Err(NotifyError::Api(reply.error.unwrap_or_else(|| "unknown_error".to_string())));
        }
        Ok(())
    }
}
