//! Completion driver contract and stream pumping
//!
//! The completion driver owns the provider HTTP connection; this crate only
//! specifies its surface and provides the pump that feeds a live chunk
//! stream through a fresh [`StreamNormalizer`], forwarding prose deltas the
//! moment they are safe to show and ceasing to poll the upstream as soon as
//! the tool block closes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::dialect::WirePayload;
use crate::error::Result;
use crate::stream::StreamNormalizer;

/// Transport owner for one provider family.
///
/// Implementations live outside this crate (they need HTTP, retries and
/// timeouts); test fakes implement it over canned chunk streams. Retries
/// re-enter the whole translate+send+normalize cycle with fresh instances.
#[async_trait]
pub trait CompletionDriver: Send + Sync {
    /// Perform a non-streamed completion, returning the raw response text.
    async fn complete(&self, payload: &WirePayload) -> Result<String>;

    /// Open a streamed completion, yielding raw text chunks as they arrive.
    fn stream(&self, payload: &WirePayload) -> BoxStream<'static, Result<String>>;
}

/// The separated output of one normalized completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    /// Concatenation of every emitted prose delta
    pub prose: String,
    /// The normalized tool-call fragment, if the model invoked tools
    pub function_calls: Option<String>,
}

/// Pump a chunk stream through a fresh normalizer.
///
/// Each prose delta is forwarded on `deltas` immediately. The upstream
/// stream stops being polled (and is dropped on return) as soon as the
/// normalizer reports the tool block closed - the model may keep generating
/// after the closing tag and that text is intentionally discarded.
pub async fn drive_stream<S>(
    mut chunks: S,
    deltas: mpsc::Sender<String>,
) -> Result<NormalizedResponse>
where
    S: Stream<Item = Result<String>> + Unpin,
{
    let (mut normalizer, _cancel) = StreamNormalizer::new();
    let mut prose = String::new();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if let Some(delta) = normalizer.append(&chunk) {
            prose.push_str(&delta);
            let _ = deltas.send(delta).await;
        }
        if normalizer.is_done() {
            debug!("closing marker seen, abandoning upstream stream");
            break;
        }
    }

    if let Some(delta) = normalizer.finish() {
        prose.push_str(&delta);
        let _ = deltas.send(delta).await;
    }

    Ok(NormalizedResponse {
        prose,
        function_calls: normalizer.function_calls(),
    })
}
