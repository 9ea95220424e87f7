/*!
common/src/lib.rs

Shared configuration types for newsbrief.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader with default/override merging
- Environment-variable resolution for credentials
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One feed to poll. Listed order in the config file is processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    /// Display-name fallback when the feed metadata carries no title
    pub title: Option<String>,
    /// Per-source cap on summarized items per run; defaults to [delivery] max_items
    pub max_items: Option<usize>,
}

/// Summarization endpoint config (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key (never the key itself)
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

/// Notes-service sink config (used if `sink.kind = "notes"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesSinkConfig {
    pub api_url: String,
    pub account_env: Option<String>,
    pub app_password_env: Option<String>,
    /// Label attached to every created note
    pub label: Option<String>,
    /// Color tag attached to every created note
    pub color: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Chat-push sink config (used if `sink.kind = "push"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSinkConfig {
    pub api_url: String,
    pub token_env: Option<String>,
    pub recipient_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Sink top-level config grouping the variant specifics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub kind: Option<String>, // "notes", "push"
    pub notes: Option<NotesSinkConfig>,
    pub push: Option<PushSinkConfig>,
}

/// Delivery pacing and default caps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Fixed pause between deliveries, to respect sink rate limits
    pub pace_seconds: Option<u64>,
    /// Default per-source item cap when a feed does not set its own
    pub max_items: Option<usize>,
}

/// Feed fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_seconds: Option<u64>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    pub llm: Option<LlmConfig>,
    pub sink: Option<SinkConfig>,
    pub delivery: Option<DeliveryConfig>,
    pub fetch: Option<FetchConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Validate the configuration shape before anything else runs.
    /// This catches structural problems (no feeds, unknown sink kind, a sink
    /// section without its credential variable names). Resolving the named
    /// environment variables happens later, in the component factories, but
    /// still before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            bail!("no feeds configured: add at least one [[feeds]] entry");
        }
        for feed in &self.feeds {
            if feed.url.trim().is_empty() {
                bail!("a [[feeds]] entry has an empty url");
            }
        }

        let llm = self
            .llm
            .as_ref()
            .context("missing [llm] section: the summarization endpoint must be configured")?;
        if llm.api_key_env.as_deref().map_or(true, |v| v.trim().is_empty()) {
            bail!("missing [llm] api_key_env: name the environment variable holding the API key");
        }

        let sink = self
            .sink
            .as_ref()
            .context("missing [sink] section: a delivery sink must be configured")?;
        match sink.kind.as_deref() {
            Some("notes") => {
                let notes = sink
                    .notes
                    .as_ref()
                    .context("sink.kind is \"notes\" but the [sink.notes] section is missing")?;
                if notes.account_env.is_none() || notes.app_password_env.is_none() {
                    bail!("[sink.notes] must name account_env and app_password_env");
                }
            }
            Some("push") => {
                let push = sink
                    .push
                    .as_ref()
                    .context("sink.kind is \"push\" but the [sink.push] section is missing")?;
                if push.token_env.is_none() || push.recipient_env.is_none() {
                    bail!("[sink.push] must name token_env and recipient_env");
                }
            }
            Some(other) => bail!("unknown sink kind '{}' (expected \"notes\" or \"push\")", other),
            None => bail!("missing [sink] kind: choose \"notes\" or \"push\""),
        }

        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read a required environment variable, with a descriptive error naming it.
/// Credentials are only ever passed through the environment; config files
/// carry the variable *names*.
pub fn require_env(var: &str) -> Result<String> {
    std::env::var(var).with_context(|| format!("required environment variable '{}' is not set", var))
}
