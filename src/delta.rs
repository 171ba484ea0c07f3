//! Decoding of completion-chunk payloads carried on SSE data lines.
//!
//! Each data line is expected to hold either the terminal `[DONE]` marker or
//! a JSON record whose `choices[0].delta.content` carries the next fragment
//! of assistant text. Records without a content delta (role markers, finish
//! markers, unknown shapes) are tolerated and simply produce nothing.

use serde::Deserialize;

use crate::sse::is_done_marker;

/// Outcome of decoding one data-line payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// The payload is the terminal sentinel; no further fragments will arrive.
    Done,
    /// The payload carried a non-empty incremental piece of assistant text.
    Fragment(String),
    /// Valid JSON with no content delta (role marker, finish marker, or an
    /// unexpected but well-formed shape). Not an error.
    Empty,
    /// Not valid JSON. Usually means the payload was split across a chunk
    /// boundary and the rest has not arrived yet.
    Unparseable,
}

/// Decode one data-line payload into a [`DeltaOutcome`].
///
/// Only a JSON syntax failure yields [`DeltaOutcome::Unparseable`]; that is
/// the signal the assembler uses to retry the line once more of the stream
/// has arrived. A record that parses but lacks the expected delta path is
/// lenient [`DeltaOutcome::Empty`], matching what upstream services send for
/// role-only and finish chunks.
///
/// # Example
/// ```
/// use novachat::delta::{decode_delta, DeltaOutcome};
///
/// let payload = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
/// assert_eq!(decode_delta(payload), DeltaOutcome::Fragment("Hi".to_string()));
/// assert_eq!(decode_delta("[DONE]"), DeltaOutcome::Done);
/// ```
pub fn decode_delta(payload: &str) -> DeltaOutcome {
    if is_done_marker(payload) {
        return DeltaOutcome::Done;
    }

    // Two stages: a syntax failure is recoverable (the line may be half of a
    // split payload), while a shape mismatch is a complete record we ignore.
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => return DeltaOutcome::Unparseable,
    };
    let record: ChunkRecord = serde_json::from_value(value).unwrap_or_default();

    match record.choices.into_iter().next().and_then(|c| c.delta.content) {
        Some(content) if !content.is_empty() => DeltaOutcome::Fragment(content),
        _ => DeltaOutcome::Empty,
    }
}

// --- Completion chunk wire types ---

#[derive(Debug, Default, Deserialize)]
struct ChunkRecord {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}
