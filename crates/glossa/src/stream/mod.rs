//! Streaming response normalization
//!
//! A single-pass state machine that separates live prose from an embedded
//! tool-call block. Prose deltas are handed back as soon as they are safe
//! to show - a partial opening marker is withheld until the next chunk
//! proves or disproves it, so a caller rendering deltas never sees a broken
//! `<func` fragment. Once the closing marker lands, the upstream read loop
//! is told to stop via a one-shot cancellation signal and everything else
//! the model generates is discarded.

mod driver;

pub use driver::{CompletionDriver, NormalizedResponse, drive_stream};

use tokio::sync::oneshot;
use tracing::debug;

use crate::toolcall::{self, CLOSE_MARKER, OPEN_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Prose,
    InTool,
    Done,
}

/// Receiving side of the normalizer's cancellation signal.
///
/// Fires exactly once, when the closing marker appears in the stream. The
/// owner of the network connection should stop reading when it fires; the
/// normalizer itself never touches I/O.
pub struct CancelSignal {
    receiver: oneshot::Receiver<()>,
}

impl CancelSignal {
    /// Wait for the cancellation to fire. Returns immediately if the
    /// normalizer was dropped without ever closing a tool block.
    pub async fn cancelled(self) {
        let _ = self.receiver.await;
    }

    /// Non-blocking check, usable from a synchronous read loop.
    pub fn is_cancelled(&mut self) -> bool {
        matches!(self.receiver.try_recv(), Ok(()))
    }
}

/// Incremental normalizer for one streamed completion.
///
/// Created per streaming call and fed by exactly one producer; `append` is
/// not reentrant-safe. Every call does a bounded amount of string work -
/// the withheld lookahead never exceeds the opening marker's length and the
/// closing-marker scan only revisits a marker-sized tail.
pub struct StreamNormalizer {
    state: State,
    held: String,
    tool_buffer: String,
    scanned: usize,
    cancel: Option<oneshot::Sender<()>>,
}

impl StreamNormalizer {
    pub fn new() -> (Self, CancelSignal) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                state: State::Prose,
                held: String::new(),
                tool_buffer: String::new(),
                scanned: 0,
                cancel: Some(sender),
            },
            CancelSignal { receiver },
        )
    }

    /// Feed the next chunk of raw response text.
    ///
    /// Returns the prose delta that is safe to surface for this call, if
    /// any. Text belonging to a tool block is never returned; appends after
    /// the block closed are ignored entirely.
    pub fn append(&mut self, chunk: &str) -> Option<String> {
        match self.state {
            State::Done => None,
            State::InTool => {
                self.consume_tool(chunk);
                None
            }
            State::Prose => {
                let mut working = std::mem::take(&mut self.held);
                working.push_str(chunk);

                if let Some(index) = working.find(OPEN_MARKER) {
                    self.state = State::InTool;
                    debug!("tool call opening marker detected");
                    let tail = working.split_off(index);
                    self.consume_tool(&tail);
                    return (!working.is_empty()).then_some(working);
                }

                let hold = marker_prefix_suffix_len(&working);
                self.held = working.split_off(working.len() - hold);
                (!working.is_empty()).then_some(working)
            }
        }
    }

    /// Signal end-of-stream.
    ///
    /// A withheld suffix that looked like the start of a marker but never
    /// completed is flushed as ordinary prose rather than dropped.
    pub fn finish(&mut self) -> Option<String> {
        if self.state == State::Prose && !self.held.is_empty() {
            return Some(std::mem::take(&mut self.held));
        }
        None
    }

    /// The normalized tool-call fragment, if the stream produced one.
    ///
    /// `None` when no block was opened, or when the closing marker never
    /// arrived before end-of-stream - a malformed block is a valid,
    /// plain-text outcome, never an error.
    pub fn function_calls(&self) -> Option<String> {
        if self.state != State::Done {
            return None;
        }
        toolcall::normalize_block(&self.tool_buffer)
    }

    /// Whether the tool block has closed and the upstream stream should be
    /// cancelled.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// One-shot convenience for responses retrieved non-streamed: feed the
    /// whole text through the same machine and return the separated prose
    /// and tool-call fragment.
    pub fn normalize(text: &str) -> (String, Option<String>) {
        let (mut normalizer, _cancel) = Self::new();
        let mut prose = String::new();
        if let Some(delta) = normalizer.append(text) {
            prose.push_str(&delta);
        }
        if let Some(delta) = normalizer.finish() {
            prose.push_str(&delta);
        }
        let calls = normalizer.function_calls();
        (prose, calls)
    }

    fn consume_tool(&mut self, text: &str) {
        self.tool_buffer.push_str(text);

        // Only the tail that could newly complete the closing marker needs
        // rescanning.
        let from = self.scanned.saturating_sub(CLOSE_MARKER.len() - 1);
        let from = floor_char_boundary(&self.tool_buffer, from);
        if let Some(index) = self.tool_buffer[from..].find(CLOSE_MARKER) {
            self.tool_buffer.truncate(from + index + CLOSE_MARKER.len());
            self.state = State::Done;
            debug!("tool call block closed, cancelling upstream stream");
            if let Some(sender) = self.cancel.take() {
                let _ = sender.send(());
            }
        } else {
            self.scanned = self.tool_buffer.len();
        }
    }
}

/// Length of the longest strict, non-empty suffix of `text` that is a
/// prefix of the opening marker. Bounded by the marker length, independent
/// of how much prose came before.
fn marker_prefix_suffix_len(text: &str) -> usize {
    let max = (OPEN_MARKER.len() - 1).min(text.len());
    for length in (1..=max).rev() {
        let start = text.len() - length;
        if text.is_char_boundary(start) && OPEN_MARKER.starts_with(&text[start..]) {
            return length;
        }
    }
    0
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
