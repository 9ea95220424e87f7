use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dedup;
use crate::ingestion::{FeedEntry, FeedSource};
use crate::llm::SummaryProvider;
use crate::sink::{DeliveryMessage, DeliverySink};

/// Counters for one pipeline run. Purely informational; per-entry outcomes
/// are logged where they happen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources: usize,
    pub entries: usize,
    pub delivered: usize,
    pub duplicates: usize,
    pub summary_failures: usize,
    pub delivery_failures: usize,
}

/// Orchestrates sources -> entries -> dedup -> oracle -> sink, strictly
/// sequentially. No entry's failure aborts the run; only startup
/// (configuration) errors can do that, and those happen before a runner
/// exists.
pub struct PipelineRunner {
    oracle: Arc<dyn SummaryProvider>,
    sink: Arc<dyn DeliverySink>,
    pace: Duration,
    color: Option<String>,
    labels: Vec<String>,
}

impl PipelineRunner {
    pub fn new(oracle: Arc<dyn SummaryProvider>, sink: Arc<dyn DeliverySink>, pace: Duration) -> Self {
        Self {
            oracle,
            sink,
            pace,
            color: None,
            labels: Vec::new(),
        }
    }

    /// Color tag and labels stamped on every delivered message (sinks that
    /// have no notion of them ignore them).
    pub fn with_message_style(mut self, color: Option<String>, labels: Vec<String>) -> Self {
        self.color = color;
        self.labels = labels;
        self
    }

    /// One full pass over all sources, in configured order. Fresh state every
    /// time; nothing carries over between runs.
    pub async fn run(&self, sources: &[FeedSource]) -> RunReport {
        let mut report = RunReport::default();

        for source in sources {
            let (label, entries) = source.fetch().await;
            report.sources += 1;
            report.entries += entries.len();
            info!(source = %label, entries = entries.len(), "processing source");

            self.process_source(&label, &entries, source.max_items(), &mut report)
                .await;

            // Flush sinks that buffer writes; a no-op for the rest.
            if let Err(e) = self.sink.sync().await {
                warn!(source = %label, error = %e, "sink sync failed");
            }
        }

        info!(
            delivered = report.delivered,
            duplicates = report.duplicates,
            summary_failures = report.summary_failures,
            delivery_failures = report.delivery_failures,
            "run complete"
        );
        report
    }

    /// Process one source's entries in feed order.
    ///
    /// A summarization slot is consumed when an entry reaches the oracle,
    /// succeed or fail, so oracle calls per source never exceed `max_items`.
    /// Duplicates are filtered before the oracle and consume no slot.
    pub async fn process_source(
        &self,
        label: &str,
        entries: &[FeedEntry],
        max_items: usize,
        report: &mut RunReport,
    ) {
        let mut attempted = 0usize;

        for entry in entries {
            if attempted >= max_items {
                debug!(source = %label, cap = max_items, "per-source cap reached");
                break;
            }

            if dedup::already_delivered(self.sink.as_ref(), &entry.title).await {
                info!(source = %label, title = %entry.title, "skipping duplicate");
                report.duplicates += 1;
                continue;
            }

            attempted += 1;
            debug!(source = %label, title = %entry.title, published = ?entry.published, "summarizing");

            let text = flatten_body(&entry.body);
            let brief = match self.oracle.summarize(&text, label).await {
                Ok(brief) => brief,
                Err(e) => {
                    warn!(source = %label, title = %entry.title, error = %e, "summarization failed, entry skipped");
                    report.summary_failures += 1;
                    continue;
                }
            };

            let message = DeliveryMessage {
                title: entry.title.clone(),
                body: brief,
                link: entry.link.clone(),
                color: self.color.clone(),
                labels: self.labels.clone(),
            };

            match self.sink.deliver(&message).await {
                Ok(()) => {
                    info!(source = %label, title = %entry.title, sink = self.sink.sink_name(), "delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(source = %label, title = %entry.title, error = %e, "delivery failed, continuing");
                    report.delivery_failures += 1;
                }
            }

            // Fixed pacing between deliveries; the sink's rate limit is the
            // only shared resource.
            tokio::time::sleep(self.pace).await;
        }
    }
}

/// Flatten an HTML-ish feed body into plain text for the oracle. Falls back
/// to the raw body when conversion fails or produces nothing.
fn flatten_body(body: &str) -> String {
    match html2text::from_read(body.as_bytes(), 80) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => body.trim().to_string(),
    }
}
