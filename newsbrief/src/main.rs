/*
newsbrief - single-binary main.rs
One invocation is one pass: poll the configured feeds, summarize new entries
through the LLM endpoint and deliver each brief to the configured sink.
Scheduling across runs belongs to the caller (cron, CI, a systemd timer).
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsbrief::ingestion::FeedSource;
use newsbrief::llm::remote::RemoteSummaryProvider;
use newsbrief::llm::SummaryProvider;
use newsbrief::pipeline::PipelineRunner;
use newsbrief::sink::notes::NotesSink;
use newsbrief::sink::push::PushSink;
use newsbrief::sink::DeliverySink;

#[derive(Parser, Debug)]
#[command(name = "newsbrief", about = "newsbrief feed-to-summary delivery pipeline")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths: packaged defaults plus an optional override file.
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await?;
    config.validate()?;
    info!(default = ?default_path, override_file = ?override_path, "configuration loaded");

    // Every credential resolves here, before any network call. A missing
    // variable aborts with a descriptive message and zero requests made.
    let llm_cfg = config.llm.as_ref().context("missing [llm] configuration")?;
    let oracle: Arc<dyn SummaryProvider> = Arc::new(RemoteSummaryProvider::from_config(llm_cfg)?);

    let sink = build_sink(&config).await?;
    info!(sink = sink.sink_name(), "delivery sink ready");

    let fetch_timeout = config
        .fetch
        .as_ref()
        .and_then(|f| f.timeout_seconds)
        .unwrap_or(10);
    let default_max_items = config
        .delivery
        .as_ref()
        .and_then(|d| d.max_items)
        .unwrap_or(3);
    let pace_seconds = config
        .delivery
        .as_ref()
        .and_then(|d| d.pace_seconds)
        .unwrap_or(2);

    let sources: Vec<FeedSource> = config
        .feeds
        .iter()
        .map(|f| FeedSource::from_config(f, fetch_timeout, default_max_items))
        .collect();

    let (color, labels) = message_style(&config);
    let runner = PipelineRunner::new(oracle, sink, Duration::from_secs(pace_seconds))
        .with_message_style(color, labels);

    let report = runner.run(&sources).await;
    info!(?report, "newsbrief run finished");

    // Per-entry failures are reported through the logs above, not the exit
    // status; only startup errors make this process exit non-zero.
    Ok(())
}

/// Select and construct the delivery sink from configuration. Credential
/// resolution is pure; only the notes variant performs network I/O here
/// (its login), after all credentials resolved.
async fn build_sink(config: &Config) -> Result<Arc<dyn DeliverySink>> {
    let sink_cfg = config.sink.as_ref().context("missing [sink] configuration")?;
    match sink_cfg.kind.as_deref() {
        Some("notes") => {
            let notes_cfg = sink_cfg
                .notes
                .as_ref()
                .context("sink.kind is \"notes\" but [sink.notes] is missing")?;
            let sink = NotesSink::connect_from_config(notes_cfg)
                .await
                .context("failed to connect notes sink")?;
            Ok(Arc::new(sink))
        }
        Some("push") => {
            let push_cfg = sink_cfg
                .push
                .as_ref()
                .context("sink.kind is \"push\" but [sink.push] is missing")?;
            Ok(Arc::new(PushSink::from_config(push_cfg)?))
        }
        other => Err(anyhow::anyhow!(
            "unknown sink kind {:?} (expected \"notes\" or \"push\")",
            other
        )),
    }
}

/// Color and labels stamped on every message, taken from the notes sink
/// config when present (the push sink ignores them).
fn message_style(config: &Config) -> (Option<String>, Vec<String>) {
    let notes = config.sink.as_ref().and_then(|s| s.notes.as_ref());
    let color = notes.and_then(|n| n.color.clone());
    let labels = notes
        .and_then(|n| n.label.clone())
        .map(|l| vec![l])
        .unwrap_or_default();
    (color, labels)
}
