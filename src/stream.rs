//! Incremental assembly of a streamed assistant reply.
//!
//! [`StreamAssembler`] is the protocol state machine behind one streamed
//! completion: it frames raw chunks into lines, classifies them, decodes
//! data payloads, and grows the reply fragment by fragment. It performs no
//! I/O of its own, so every transition can be exercised by feeding synthetic
//! chunk sequences.

use crate::delta::{decode_delta, DeltaOutcome};
use crate::sse::{classify, LineBuffer, SseLine};

/// Lifecycle of one streamed reply.
///
/// Starts in `Streaming` and moves to exactly one terminal state:
/// `Done` when the `[DONE]` sentinel arrives, `Closed` when the stream ends
/// without one (a normal completion, not a failure), or `Failed` on a
/// transport error. Terminal states absorb all further input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Fragments may still arrive.
    Streaming,
    /// The terminal sentinel was seen; the reply is complete.
    Done,
    /// The stream ended without a sentinel; the reply so far is kept.
    Closed,
    /// The transport errored mid-read; the caller discards the reply.
    Failed,
}

impl StreamState {
    /// True once no further input will be processed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, StreamState::Streaming)
    }
}

/// Reassembles an SSE-encoded completion stream into a growing reply.
///
/// Feed each network chunk to [`StreamAssembler::push_chunk`]; every decoded
/// fragment is appended to the reply and handed to the `on_fragment` callback
/// (the fragment itself, not the running total; [`StreamAssembler::message`]
/// exposes that). Call [`StreamAssembler::finish`] when the underlying stream
/// ends, or [`StreamAssembler::fail`] when it errors.
///
/// Delivery chunks do not align with line or JSON boundaries. Incomplete
/// lines wait in the frame buffer; a framed data line whose payload does not
/// parse is re-queued and retried when the next chunk arrives, so a payload
/// split across reads is never treated as a protocol error. A line that never
/// becomes parseable yields no further fragments but no failure either.
///
/// # Example
/// ```
/// use novachat::stream::{StreamAssembler, StreamState};
///
/// let mut fragments = Vec::new();
/// let mut assembler = StreamAssembler::new(|f: &str| fragments.push(f.to_string()));
///
/// assembler.push_chunk(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n");
/// assembler.push_chunk(b"data: [DONE]\n");
///
/// assert_eq!(assembler.state(), StreamState::Done);
/// assert_eq!(assembler.message(), "Hi");
/// assert_eq!(fragments, vec!["Hi"]);
/// ```
pub struct StreamAssembler<F> {
    lines: LineBuffer,
    state: StreamState,
    message: String,
    on_fragment: F,
}

impl<F: FnMut(&str)> StreamAssembler<F> {
    /// Create an assembler that reports each fragment to `on_fragment`.
    pub fn new(on_fragment: F) -> Self {
        Self {
            lines: LineBuffer::new(),
            state: StreamState::Streaming,
            message: String::new(),
            on_fragment,
        }
    }

    /// Process one chunk of raw stream bytes.
    ///
    /// No-op once the assembler is in a terminal state.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.state.is_terminal() {
            return;
        }

        self.lines.feed(chunk);
        while let Some(line) = self.lines.next_line() {
            let outcome = match classify(&line) {
                SseLine::Ignorable | SseLine::Unrecognized => continue,
                SseLine::Data(payload) => decode_delta(payload),
            };

            match outcome {
                DeltaOutcome::Done => {
                    self.state = StreamState::Done;
                    return;
                }
                DeltaOutcome::Fragment(text) => {
                    self.message.push_str(&text);
                    (self.on_fragment)(&text);
                }
                DeltaOutcome::Empty => {}
                DeltaOutcome::Unparseable => {
                    // Likely a payload split across a chunk boundary: put the
                    // line back and retry once the next chunk arrives.
                    self.lines.requeue(line);
                    return;
                }
            }
        }
    }

    /// Mark the underlying stream as exhausted.
    ///
    /// Without a sentinel this is a normal completion: the state becomes
    /// `Closed` and the accumulated reply is kept. Any unterminated trailing
    /// bytes are discarded. No-op in a terminal state.
    pub fn finish(&mut self) {
        if self.state == StreamState::Streaming {
            self.state = StreamState::Closed;
        }
    }

    /// Mark the underlying stream as failed mid-read.
    ///
    /// The accumulated reply stays readable but the caller is expected to
    /// discard it. No-op in a terminal state.
    pub fn fail(&mut self) {
        if self.state == StreamState::Streaming {
            self.state = StreamState::Failed;
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The reply accumulated so far.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consume the assembler and take the accumulated reply.
    pub fn into_message(self) -> String {
        self.message
    }
}
