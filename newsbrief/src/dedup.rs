use tracing::warn;

use crate::sink::DeliverySink;

/// Decide whether an entry title was already delivered, by asking the sink.
///
/// Sinks without lookup capability degrade to "never seen" - there is no
/// cross-run dedup for them. A lookup transport error is also treated as
/// "not seen": the occasional duplicate beats silently dropping an article.
///
/// Always called before the oracle, so duplicates cost no summarization call.
pub async fn already_delivered(sink: &dyn DeliverySink, title: &str) -> bool {
    if !sink.supports_lookup() {
        return false;
    }
    match sink.contains_title(title).await {
        Ok(seen) => seen,
        Err(e) => {
            warn!(title = %title, error = %e, "dedup lookup failed, treating entry as unseen");
            false
        }
    }
}
