use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use newsbrief::ingestion::{FeedEntry, FeedSource};
use newsbrief::llm::SummaryProvider;
use newsbrief::pipeline::{PipelineRunner, RunReport};
use newsbrief::sink::{DeliveryMessage, DeliverySink};

/// Oracle that counts invocations and optionally fails every call.
struct CountingOracle {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingOracle {
    fn ok() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), fail: false })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), fail: true })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SummaryProvider for CountingOracle {
    async fn summarize(&self, text: &str, _source_label: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("oracle transport error");
        }
        Ok(format!("brief of: {}", text.lines().next().unwrap_or_default()))
    }
}

/// Sink that records delivered titles in order, with optional lookup
/// knowledge and optional per-delivery failure.
#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<String>>,
    known_titles: Vec<String>,
    lookup: bool,
    fail_deliver: bool,
    sync_calls: AtomicUsize,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_known_titles(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            known_titles: titles.iter().map(|t| t.to_string()).collect(),
            lookup: true,
            ..Self::default()
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { fail_deliver: true, ..Self::default() })
    }

    fn titles(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DeliverySink for RecordingSink {
    fn sink_name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, message: &DeliveryMessage) -> Result<()> {
        if self.fail_deliver {
            anyhow::bail!("sink rejected the message");
        }
        self.delivered.lock().unwrap().push(message.title.clone());
        Ok(())
    }

    fn supports_lookup(&self) -> bool {
        self.lookup
    }

    async fn contains_title(&self, title: &str) -> Result<bool> {
        Ok(self.known_titles.iter().any(|t| t == title))
    }

    async fn sync(&self) -> Result<()> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Notes-like sink: remembers every created note and answers lookups from
/// that memory, like the real notes service does across runs.
#[derive(Default)]
struct MemoryNotesSink {
    notes: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl DeliverySink for MemoryNotesSink {
    fn sink_name(&self) -> &str {
        "memory-notes"
    }

    async fn deliver(&self, message: &DeliveryMessage) -> Result<()> {
        self.notes.lock().unwrap().push(message.title.clone());
        Ok(())
    }

    fn supports_lookup(&self) -> bool {
        true
    }

    async fn contains_title(&self, title: &str) -> Result<bool> {
        Ok(self.notes.lock().unwrap().iter().any(|t| t == title))
    }
}

fn entry(n: usize) -> FeedEntry {
    FeedEntry {
        title: format!("Story {}", n),
        link: format!("https://example.com/{}", n),
        body: format!("Body of story {}", n),
        published: None,
    }
}

fn entries(count: usize) -> Vec<FeedEntry> {
    (1..=count).map(entry).collect()
}

fn runner(
    oracle: Arc<CountingOracle>,
    sink: Arc<RecordingSink>,
    pace: Duration,
) -> PipelineRunner {
    PipelineRunner::new(oracle, sink, pace)
}

// Scenario: 5 entries, max_items = 3, no duplicates, oracle succeeds.
// Exactly 3 deliveries in feed order, each followed by the pacing delay.
#[tokio::test]
async fn cap_limits_deliveries_in_feed_order_with_pacing() {
    let oracle = CountingOracle::ok();
    let sink = RecordingSink::new();
    let pace = Duration::from_millis(25);
    let runner = runner(oracle.clone(), sink.clone(), pace);

    let mut report = RunReport::default();
    let started = tokio::time::Instant::now();
    runner.process_source("wire", &entries(5), 3, &mut report).await;
    let elapsed = started.elapsed();

    assert_eq!(oracle.calls(), 3);
    assert_eq!(sink.titles(), vec!["Story 1", "Story 2", "Story 3"]);
    assert_eq!(report.delivered, 3);
    assert_eq!(report.duplicates, 0);
    // Three deliveries, one fixed pause after each
    assert!(elapsed >= pace * 3, "expected pacing delays, got {:?}", elapsed);
}

// Scenario: entry #1 already exists per the sink lookup.
// The oracle runs once (entry #2 only) and one message is delivered.
#[tokio::test]
async fn duplicates_are_filtered_before_the_oracle() {
    let oracle = CountingOracle::ok();
    let sink = RecordingSink::with_known_titles(&["Story 1"]);
    let runner = runner(oracle.clone(), sink.clone(), Duration::ZERO);

    let mut report = RunReport::default();
    runner.process_source("wire", &entries(2), 5, &mut report).await;

    assert_eq!(oracle.calls(), 1);
    assert_eq!(sink.titles(), vec!["Story 2"]);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.delivered, 1);
}

// Property: when every entry is a known duplicate, the oracle is never
// invoked at all.
#[tokio::test]
async fn all_duplicates_mean_zero_oracle_calls() {
    let oracle = CountingOracle::ok();
    let sink = RecordingSink::with_known_titles(&["Story 1", "Story 2", "Story 3"]);
    let runner = runner(oracle.clone(), sink.clone(), Duration::ZERO);

    let mut report = RunReport::default();
    runner.process_source("wire", &entries(3), 5, &mut report).await;

    assert_eq!(oracle.calls(), 0);
    assert!(sink.titles().is_empty());
    assert_eq!(report.duplicates, 3);
}

// Scenario: the oracle fails for every entry. Zero deliveries, the run
// completes, and every failure is counted (one log line each).
#[tokio::test]
async fn oracle_failures_skip_entries_without_delivering() {
    let oracle = CountingOracle::failing();
    let sink = RecordingSink::new();
    let runner = runner(oracle.clone(), sink.clone(), Duration::ZERO);

    let mut report = RunReport::default();
    runner.process_source("wire", &entries(4), 10, &mut report).await;

    assert_eq!(oracle.calls(), 4);
    assert!(sink.titles().is_empty());
    assert_eq!(report.delivered, 0);
    assert_eq!(report.summary_failures, 4);
}

// Property: oracle invocations never exceed max_items, even when every
// summarization fails.
#[tokio::test]
async fn failed_summaries_still_consume_cap_slots() {
    let oracle = CountingOracle::failing();
    let sink = RecordingSink::new();
    let runner = runner(oracle.clone(), sink.clone(), Duration::ZERO);

    let mut report = RunReport::default();
    runner.process_source("wire", &entries(5), 2, &mut report).await;

    assert_eq!(oracle.calls(), 2);
    assert_eq!(report.summary_failures, 2);
}

// Scenario: the sink rejects every delivery. The pipeline logs and moves on
// without aborting the source loop.
#[tokio::test]
async fn sink_failures_do_not_abort_the_run() {
    let oracle = CountingOracle::ok();
    let sink = RecordingSink::failing();
    let runner = runner(oracle.clone(), sink.clone(), Duration::ZERO);

    let mut report = RunReport::default();
    runner.process_source("wire", &entries(2), 5, &mut report).await;

    assert_eq!(oracle.calls(), 2);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.delivery_failures, 2);
}

// End to end: a real feed over HTTP, mock oracle and sink. The sink is
// synced once per source.
#[tokio::test]
async fn full_run_processes_a_feed_and_syncs_the_sink() {
    let mut server = mockito::Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed.xml")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <rss version="2.0">
              <channel>
                <title>Example Wire</title>
                <link>https://example.com</link>
                <description>Test feed</description>
                <item>
                  <title>Alpha</title>
                  <link>https://example.com/alpha</link>
                  <description>Alpha body</description>
                </item>
                <item>
                  <title>Beta</title>
                  <link>https://example.com/beta</link>
                  <description>Beta body</description>
                </item>
              </channel>
            </rss>"#,
        )
        .create_async()
        .await;

    let oracle = CountingOracle::ok();
    let sink = RecordingSink::new();
    let runner = runner(oracle.clone(), sink.clone(), Duration::ZERO);

    let source = FeedSource::new(format!("{}/feed.xml", server.url()), 5);
    let report = runner.run(&[source]).await;

    assert_eq!(report.sources, 1);
    assert_eq!(report.entries, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(sink.titles(), vec!["Alpha", "Beta"]);
    assert_eq!(sink.sync_calls.load(Ordering::SeqCst), 1);
}

// Idempotence: with a lookup-capable sink, running twice over an unchanged
// feed produces at most one note per title - the second run sees the first
// run's notes.
#[tokio::test]
async fn second_run_over_unchanged_feed_creates_no_new_notes() {
    let oracle = CountingOracle::ok();
    let sink = Arc::new(MemoryNotesSink::default());
    let runner = PipelineRunner::new(oracle.clone(), sink.clone(), Duration::ZERO);

    let mut first = RunReport::default();
    runner.process_source("wire", &entries(3), 5, &mut first).await;
    assert_eq!(first.delivered, 3);
    assert_eq!(sink.notes.lock().unwrap().len(), 3);

    let mut second = RunReport::default();
    runner.process_source("wire", &entries(3), 5, &mut second).await;
    assert_eq!(second.delivered, 0);
    assert_eq!(second.duplicates, 3);
    assert_eq!(sink.notes.lock().unwrap().len(), 3);
    // The oracle ran only for the first pass
    assert_eq!(oracle.calls(), 3);
}

// An unreachable feed yields an empty source; the run still completes.
#[tokio::test]
async fn unreachable_feed_is_isolated_to_its_source() {
    let oracle = CountingOracle::ok();
    let sink = RecordingSink::new();
    let runner = runner(oracle.clone(), sink.clone(), Duration::ZERO);

    let source = FeedSource::new("http://127.0.0.1:9/feed.xml", 5).with_timeout(1);
    let report = runner.run(&[source]).await;

    assert_eq!(report.sources, 1);
    assert_eq!(report.entries, 0);
    assert_eq!(report.delivered, 0);
    assert_eq!(oracle.calls(), 0);
}
