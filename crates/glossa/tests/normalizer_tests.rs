//! Integration tests for the stream normalizer
//!
//! Exercises the incremental parser against the properties the wire
//! protocol depends on: streaming and batch agree, partial markers never
//! leak, cancellation is immediate, and tool ids are assigned stably.

use glossa::stream::StreamNormalizer;
use glossa::toolcall::OPEN_MARKER;

const EXAMPLE: &str =
    "Let me check. <function_calls><invoke><tool_name>X</tool_name></invoke></function_calls>";

/// Feed `text` in chunks of `size` characters, returning the concatenated
/// deltas and the final tool-call fragment.
fn feed_chunked(text: &str, size: usize) -> (String, Option<String>) {
    let (mut normalizer, _cancel) = StreamNormalizer::new();
    let mut prose = String::new();

    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(size) {
        let chunk: String = chunk.iter().collect();
        if let Some(delta) = normalizer.append(&chunk) {
            prose.push_str(&delta);
        }
    }
    if let Some(delta) = normalizer.finish() {
        prose.push_str(&delta);
    }
    (prose, normalizer.function_calls())
}

// =============================================================================
// Streaming equals batch
// =============================================================================

#[test]
fn test_char_by_char_equals_one_shot() {
    let (batch_prose, batch_calls) = StreamNormalizer::normalize(EXAMPLE);
    let (stream_prose, stream_calls) = feed_chunked(EXAMPLE, 1);

    assert_eq!(stream_prose, batch_prose);
    assert_eq!(stream_calls, batch_calls);
    assert_eq!(batch_prose, "Let me check. ");
    assert!(batch_calls.unwrap().contains("<tool_id>tool_0</tool_id>"));
}

#[test]
fn test_all_chunk_sizes_agree() {
    let (batch_prose, batch_calls) = StreamNormalizer::normalize(EXAMPLE);
    for size in 1..=EXAMPLE.len() {
        let (prose, calls) = feed_chunked(EXAMPLE, size);
        assert_eq!(prose, batch_prose, "chunk size {size}");
        assert_eq!(calls, batch_calls, "chunk size {size}");
    }
}

#[test]
fn test_plain_text_char_by_char() {
    let text = "No tools today, just < signs and <tags> in prose.";
    let (prose, calls) = feed_chunked(text, 1);
    assert_eq!(prose, text);
    assert!(calls.is_none());
}

// =============================================================================
// No partial tag leakage
// =============================================================================

#[test]
fn test_no_delta_ends_with_marker_prefix() {
    let input = "Some prose here <function_calls><invoke><tool_name>x</tool_name></invoke></function_calls>";

    for split in 0..=input.len() {
        let (mut normalizer, _cancel) = StreamNormalizer::new();
        let mut deltas = Vec::new();

        for chunk in [&input[..split], &input[split..]] {
            if let Some(delta) = normalizer.append(chunk) {
                deltas.push(delta);
            }
        }
        if let Some(delta) = normalizer.finish() {
            deltas.push(delta);
        }

        for delta in &deltas {
            for prefix_len in 1..OPEN_MARKER.len() {
                let prefix = &OPEN_MARKER[..prefix_len];
                assert!(
                    !delta.ends_with(prefix),
                    "split {split}: delta {delta:?} ends with marker prefix {prefix:?}"
                );
            }
        }
    }
}

#[test]
fn test_false_positive_prefix_is_recovered() {
    // "<function" followed by ordinary prose must come back out verbatim.
    let input = "a <function pointer is not a tool call";
    for split in 0..=input.len() {
        let (mut normalizer, _cancel) = StreamNormalizer::new();
        let mut prose = String::new();
        for chunk in [&input[..split], &input[split..]] {
            if let Some(delta) = normalizer.append(chunk) {
                prose.push_str(&delta);
            }
        }
        if let Some(delta) = normalizer.finish() {
            prose.push_str(&delta);
        }
        assert_eq!(prose, input, "split at {split}");
    }
}

// =============================================================================
// Cancellation timing
// =============================================================================

#[test]
fn test_cancellation_fires_on_close_and_trailing_is_ignored() {
    let (mut normalizer, mut cancel) = StreamNormalizer::new();

    assert_eq!(normalizer.append("<function_calls><invoke></invoke>"), None);
    assert!(!cancel.is_cancelled());

    assert_eq!(normalizer.append("</function_calls>"), None);
    assert!(normalizer.is_done());
    assert!(cancel.is_cancelled());

    assert_eq!(normalizer.append("TRAILING"), None);
    assert_eq!(normalizer.finish(), None);

    let calls = normalizer.function_calls().unwrap_or_default();
    assert!(!calls.contains("TRAILING"));
    let (prose, calls) =
        StreamNormalizer::normalize("<function_calls></function_calls>TRAILING");
    assert_eq!(prose, "");
    assert!(calls.is_none());
}

// =============================================================================
// Tool id assignment
// =============================================================================

#[test]
fn test_missing_ids_assigned_in_document_order() {
    let input = "<function_calls>\
                 <invoke><tool_name>a</tool_name></invoke>\
                 <invoke><tool_name>b</tool_name></invoke>\
                 <invoke><tool_name>c</tool_name></invoke>\
                 </function_calls>";
    let (_, calls) = StreamNormalizer::normalize(input);
    let calls = calls.unwrap();

    let a = calls.find("<tool_id>tool_0</tool_id>").unwrap();
    let b = calls.find("<tool_id>tool_1</tool_id>").unwrap();
    let c = calls.find("<tool_id>tool_2</tool_id>").unwrap();
    assert!(a < b && b < c);
}

#[test]
fn test_existing_id_survives_normalization() {
    let input = "<function_calls>\
                 <invoke><tool_name>a</tool_name><tool_id>call_abc</tool_id></invoke>\
                 </function_calls>";
    let (_, calls) = StreamNormalizer::normalize(input);
    let calls = calls.unwrap();
    assert!(calls.contains("<tool_id>call_abc</tool_id>"));
    assert!(!calls.contains("tool_0"));
}

#[test]
fn test_id_assignment_identical_streamed_and_batch() {
    let input = "pre <function_calls>\
                 <invoke><tool_name>a</tool_name></invoke>\
                 <invoke><tool_name>b</tool_name></invoke>\
                 </function_calls>";
    let (_, batch) = StreamNormalizer::normalize(input);
    let (_, streamed) = feed_chunked(input, 7);
    assert_eq!(batch, streamed);
}

// =============================================================================
// Malformed input
// =============================================================================

#[test]
fn test_unclosed_block_is_plain_text_outcome() {
    let (prose, calls) =
        StreamNormalizer::normalize("Checking. <function_calls><invoke><tool_name>x</tool_name>");
    assert_eq!(prose, "Checking. ");
    assert!(calls.is_none());
}

#[test]
fn test_block_without_invoke_is_plain_text_outcome() {
    let (prose, calls) = StreamNormalizer::normalize("hi <function_calls>garbage</function_calls>");
    assert_eq!(prose, "hi ");
    assert!(calls.is_none());
}
