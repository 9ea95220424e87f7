use anyhow::Result;

/// Final message handed to a sink. Constructed fresh per entry, never mutated.
/// Color and labels are hints only; sinks without a notion of them (the push
/// variant) ignore them.
#[derive(Debug, Clone)]
pub struct DeliveryMessage {
    pub title: String,
    /// The plain-text brief
    pub body: String,
    pub link: String,
    pub color: Option<String>,
    pub labels: Vec<String>,
}

/// A remote system that makes a brief visible to a human recipient.
/// `deliver` is the single required capability; lookup (for dedup) and sync
/// (end-of-batch flush) are optional and default to "not supported".
///
/// A delivered message cannot be recalled; each delivery is independently
/// committed with no transactional guarantee across messages.
#[async_trait::async_trait]
pub trait DeliverySink: Send + Sync {
    fn sink_name(&self) -> &str;

    async fn deliver(&self, message: &DeliveryMessage) -> Result<()>;

    /// Whether `contains_title` is backed by a real lookup. When false, dedup
    /// degrades to "never seen" - an acknowledged gap, not a bug.
    fn supports_lookup(&self) -> bool {
        false
    }

    async fn contains_title(&self, _title: &str) -> Result<bool> {
        Ok(false)
    }

    /// Flush pending writes at the end of a batch. No-op for sinks that
    /// commit on every deliver.
    async fn sync(&self) -> Result<()> {
        Ok(())
    }
}

pub mod notes;
pub mod push;
