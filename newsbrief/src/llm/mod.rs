use anyhow::Result;

/// Core trait for the remote summarization service.
/// One call per entry; a failure means the entry is skipped, never retried.
#[async_trait::async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Produce a short plain-text brief of `text`. The source label only
    /// flavors the formatting instruction given to the model.
    async fn summarize(&self, text: &str, source_label: &str) -> Result<String>;
}

/// Request structure for a raw completion call
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Response from a raw completion call
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: UsageMetadata,
    pub model: String,
}

/// Token usage metadata
#[derive(Debug, Clone, Default)]
pub struct UsageMetadata {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

pub mod remote;

/// Strip the markup tokens models like to sneak into "plain text" output:
/// heading markers, bold/underline markers and backticks. Line content is
/// preserved; only the decoration goes.
pub fn strip_markup(text: &str) -> String {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut line = raw.trim();
        while let Some(rest) = line.strip_prefix('#') {
            line = rest;
        }
        let line = line
            .trim_start()
            .replace("**", "")
            .replace("__", "")
            .replace('`', "");
        lines.push(line.trim().to_string());
    }
    lines.join("\n").trim().to_string()
}
