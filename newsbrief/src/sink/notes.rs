use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{DeliveryMessage, DeliverySink};

/// Notes-service sink: creates one persistent note per brief, supports a
/// find-by-title lookup used for dedup, and flushes pending notes with an
/// explicit sync at the end of each source batch.
#[derive(Debug)]
pub struct NotesSink {
    base_url: String,
    token: String,
    client: Client,
}

impl NotesSink {
    /// Log in with account + app password and keep the session token.
    /// A rejected login aborts the run: nothing could be delivered anyway.
    pub async fn connect(
        base_url: impl Into<String>,
        account: &str,
        app_password: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("newsbrief/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        let response = client
            .post(format!("{}/login", base_url))
            .json(&LoginRequest { account, app_password })
            .send()
            .await
            .context("notes login request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("notes login rejected with status: {}", status);
        }

        let LoginResponse { token } = response
            .json()
            .await
            .context("failed to parse notes login response")?;

        info!(url = %base_url, "notes sink connected");
        Ok(Self { base_url, token, client })
    }

    /// Resolve account credentials from the environment. Pure: called before
    /// any network traffic so a missing variable aborts startup cleanly.
    pub fn credentials_from_config(cfg: &common::NotesSinkConfig) -> Result<(String, String)> {
        let account_env = cfg
            .account_env
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing account_env in [sink.notes] config"))?;
        let password_env = cfg
            .app_password_env
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing app_password_env in [sink.notes] config"))?;
        Ok((common::require_env(account_env)?, common::require_env(password_env)?))
    }

    pub async fn connect_from_config(cfg: &common::NotesSinkConfig) -> Result<Self> {
        let (account, app_password) = Self::credentials_from_config(cfg)?;
        Self::connect(
            cfg.api_url.clone(),
            &account,
            &app_password,
            cfg.timeout_seconds.unwrap_or(10),
        )
        .await
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[async_trait::async_trait]
impl DeliverySink for NotesSink {
    fn sink_name(&self) -> &str {
        "notes"
    }

    async fn deliver(&self, message: &DeliveryMessage) -> Result<()> {
        let body = format!("{}\n\nSource: {}", message.body, message.link);
        let response = self
            .client
            .post(format!("{}/notes", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&CreateNoteRequest {
                title: &message.title,
                body,
                color: message.color.as_deref(),
                labels: &message.labels,
            })
            .send()
            .await
            .context("note create request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("note create rejected with status: {}", status);
        }
        debug!(title = %message.title, "note created");
        Ok(())
    }

    fn supports_lookup(&self) -> bool {
        true
    }

    async fn contains_title(&self, title: &str) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/notes", self.base_url))
            .query(&[("query", title)])
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("note lookup request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("note lookup rejected with status: {}", status);
        }

        let found: FindResponse = response
            .json()
            .await
            .context("failed to parse note lookup response")?;
        Ok(found.notes.iter().any(|n| n.title == title))
    }

    async fn sync(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/sync", self.base_url))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("notes sync request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("notes sync rejected with status: {}", status);
        }
        debug!("notes synced");
        Ok(())
    }
}

// Notes API request/response structures
#[derive(Serialize)]
struct LoginRequest<'a> {
    account: &'a str,
    app_password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct CreateNoteRequest<'a> {
    title: &'a str,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    labels: &'a [String],
}

#[derive(Deserialize)]
struct NoteStub {
    title: String,
}

#[derive(Deserialize)]
struct FindResponse {
    notes: Vec<NoteStub>,
}
