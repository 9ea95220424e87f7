use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{DeliveryMessage, DeliverySink};

/// Chat-push sink: one bearer-authed POST per message to a messaging
/// endpoint. Success is a 2xx status; anything else is a non-fatal,
/// entry-scoped failure. No lookup capability, no sync, no retry.
#[derive(Debug)]
pub struct PushSink {
    api_url: String,
    token: String,
    recipient: String,
    client: Client,
    timeout: Duration,
}

impl PushSink {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            recipient: recipient.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Resolve token and recipient from the environment. Pure: no network.
    pub fn from_config(cfg: &common::PushSinkConfig) -> Result<Self> {
        let token_env = cfg
            .token_env
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing token_env in [sink.push] config"))?;
        let recipient_env = cfg
            .recipient_env
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing recipient_env in [sink.push] config"))?;

        let token = common::require_env(token_env)?;
        let recipient = common::require_env(recipient_env)?;

        Ok(Self::new(cfg.api_url.clone(), token, recipient)
            .with_timeout(cfg.timeout_seconds.unwrap_or(10)))
    }
}

#[async_trait::async_trait]
impl DeliverySink for PushSink {
    fn sink_name(&self) -> &str {
        "push"
    }

    async fn deliver(&self, message: &DeliveryMessage) -> Result<()> {
        let text = format!("{}\n{}\n\n{}", message.title, message.body, message.link);
        let payload = PushPayload {
            to: &self.recipient,
            messages: vec![PushMessage { kind: "text", text }],
        };

        let response = self
            .client
            .post(format!("{}/message/push", self.api_url))
            .timeout(self.timeout)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&payload)
            .send()
            .await
            .context("push request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("push rejected with status: {}", status);
        }
        debug!(title = %message.title, "message pushed");
        Ok(())
    }
}

// Push API request structures
#[derive(Serialize)]
struct PushPayload<'a> {
    to: &'a str,
    messages: Vec<PushMessage<'a>>,
}

#[derive(Serialize)]
struct PushMessage<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: String,
}
