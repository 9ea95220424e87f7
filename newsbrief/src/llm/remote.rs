use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{strip_markup, LlmRequest, LlmResponse, SummaryProvider, UsageMetadata};

/// Remote summarization oracle using an OpenAI-compatible HTTP API
#[derive(Debug)]
pub struct RemoteSummaryProvider {
    base_url: String,
    api_key: String,
    model: String,
    default_timeout: Duration,
    default_max_tokens: usize,
    default_temperature: f32,
    client: reqwest::Client,
}

impl RemoteSummaryProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            default_timeout: Duration::from_secs(30),
            default_max_tokens: 500,
            default_temperature: 0.7,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_defaults(
        mut self,
        timeout_secs: u64,
        max_tokens: usize,
        temperature: f32,
    ) -> Self {
        self.default_timeout = Duration::from_secs(timeout_secs);
        self.default_max_tokens = max_tokens;
        self.default_temperature = temperature;
        self
    }

    /// Build a provider from configuration, resolving the API key from the
    /// environment. No network traffic happens here; a missing key aborts
    /// startup before any call is made.
    pub fn from_config(cfg: &common::LlmConfig) -> Result<Self> {
        let api_key_env = cfg
            .api_key_env
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("missing api_key_env in [llm] config"))?;
        let api_key = common::require_env(api_key_env)?;

        let api_url = cfg
            .api_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
        let model = cfg.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());

        Ok(Self::new(api_url, api_key, model).with_defaults(
            cfg.timeout_seconds.unwrap_or(30),
            cfg.max_tokens.unwrap_or(500),
            cfg.temperature.unwrap_or(0.7),
        ))
    }

    /// Raw completion call: bearer auth, explicit timeout, non-2xx is an error
    /// carrying the status and response body.
    pub async fn generate(&self, request: LlmRequest) -> Result<LlmResponse> {
        let timeout = request
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);

        let max_tokens = request.max_tokens.unwrap_or(self.default_max_tokens);
        let temperature = request.temperature.unwrap_or(self.default_temperature);

        let req_body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
        };

        // The timeout covers the full exchange, response body included.
        let (status, body_text) = tokio::time::timeout(timeout, async {
            let response = self
                .client
                .post(&self.base_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&req_body)
                .send()
                .await
                .context("summarization HTTP request failed")?;
            let status = response.status();
            let body = response
                .text()
                .await
                .context("failed to read summarization response body")?;
            Ok::<_, anyhow::Error>((status, body))
        })
        .await
        .context("summarization request timed out")??;

        if !status.is_success() {
            anyhow::bail!("summarization API error {}: {}", status, body_text);
        }
        let resp_body: ChatResponse = serde_json::from_str(&body_text)
            .with_context(|| format!("failed to parse summarization response: {}", body_text))?;

        let choice = resp_body
            .choices
            .first()
            .context("summarization response has no choices")?;

        let usage = UsageMetadata {
            prompt_tokens: resp_body.usage.prompt_tokens.unwrap_or(0),
            completion_tokens: resp_body.usage.completion_tokens.unwrap_or(0),
            total_tokens: resp_body.usage.total_tokens.unwrap_or(0),
        };

        Ok(LlmResponse {
            content: choice.message.content.clone(),
            usage,
            model: resp_body.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[async_trait::async_trait]
impl SummaryProvider for RemoteSummaryProvider {
    async fn summarize(&self, text: &str, source_label: &str) -> Result<String> {
        let prompt = format!(
            r#"You are writing a short news brief for a feed labelled "{}".

Summarize the article below. Requirements:
1. Open with one sentence stating the main point.
2. Follow with up to three short lines, one key fact each.
3. Keep an objective, professional tone.
4. Plain text only - no markdown, no headings, no formatting tokens.
5. Keep the whole brief short; it is displayed as a phone-sized note.

ARTICLE:
{}
"#,
            source_label, text
        );

        let request = LlmRequest {
            prompt,
            max_tokens: None,
            temperature: Some(0.5), // Lower temperature for more consistent summarization
            timeout_seconds: None,
        };

        let response = self.generate(request).await?;

        let brief = strip_markup(&response.content);
        if brief.is_empty() {
            anyhow::bail!("summarization returned an empty brief");
        }
        Ok(brief)
    }
}

// OpenAI-compatible request/response structures
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}
