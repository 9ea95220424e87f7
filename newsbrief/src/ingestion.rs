use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// One article pulled from a feed. Immutable once fetched; the pipeline owns
/// it for a single processing cycle.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Raw or summary text, never empty (falls back to the title)
    pub body: String,
    pub published: Option<DateTime<Utc>>,
}

/// Fetches a feed from the given URL and parses it.
/// One attempt only; scheduling and failure isolation live in the caller.
pub async fn fetch_and_parse_feed(url: &str, timeout_secs: u64) -> Result<Feed> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent("newsbrief/0.1.0")
        .build()
        .context("failed to build reqwest client")?;

    let response = client.get(url).send().await.context("network error during fetch")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("feed fetch failed with status: {}", status));
    }

    let bytes = response.bytes().await.context("failed to read response body")?;
    let feed = parser::parse(bytes.as_ref()).context("failed to parse feed")?;
    Ok(feed)
}

/// A configured feed source. `fetch` never fails the run: any fetch or parse
/// error is logged and yields an empty entry list with the fallback display
/// name, so one broken feed cannot abort the other sources.
pub struct FeedSource {
    url: String,
    fallback_title: Option<String>,
    max_items: usize,
    timeout_secs: u64,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, max_items: usize) -> Self {
        Self {
            url: url.into(),
            fallback_title: None,
            max_items,
            timeout_secs: 10,
        }
    }

    pub fn with_fallback_title(mut self, title: Option<String>) -> Self {
        self.fallback_title = title;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn from_config(feed: &common::FeedConfig, timeout_secs: u64, default_max_items: usize) -> Self {
        Self {
            url: feed.url.clone(),
            fallback_title: feed.title.clone(),
            max_items: feed.max_items.unwrap_or(default_max_items),
            timeout_secs,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Fetch the feed and extract entries in feed order.
    /// Returns (display name, entries).
    pub async fn fetch(&self) -> (String, Vec<FeedEntry>) {
        let feed = match fetch_and_parse_feed(&self.url, self.timeout_secs).await {
            Ok(feed) => feed,
            Err(e) => {
                warn!(url = %self.url, error = %e, "feed fetch failed, skipping source");
                return (self.display_name(None), Vec::new());
            }
        };

        let feed_title = feed
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty());
        let label = self.display_name(feed_title);

        let entries: Vec<FeedEntry> = feed.entries.iter().filter_map(entry_from_feed).collect();
        debug!(url = %self.url, label = %label, count = entries.len(), "fetched feed");
        (label, entries)
    }

    /// Display name: feed metadata title, else the configured title, else the
    /// URL host, else the URL itself.
    fn display_name(&self, feed_title: Option<String>) -> String {
        feed_title
            .or_else(|| self.fallback_title.clone())
            .or_else(|| {
                url::Url::parse(&self.url)
                    .ok()
                    .and_then(|u| u.host_str().map(|h| h.to_string()))
            })
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Extract one FeedEntry from a parsed feed item. Entries without a link or
/// title are dropped (there is nothing to deliver or dedup against). The body
/// falls back content -> summary -> title.
fn entry_from_feed(entry: &feed_rs::model::Entry) -> Option<FeedEntry> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();
    let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();

    if link.is_empty() {
        debug!(title = %title, "skipping entry without URL");
        return None;
    }
    if title.is_empty() {
        debug!(link = %link, "skipping entry without title");
        return None;
    }

    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .filter(|b| !b.trim().is_empty())
        .or_else(|| {
            entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .filter(|s| !s.trim().is_empty())
        })
        .unwrap_or_else(|| title.clone());

    Some(FeedEntry {
        title,
        link,
        body,
        published: entry.published,
    })
}
