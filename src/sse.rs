//! Server-Sent Events (SSE) line framing and classification.
//!
//! Completion streams arrive as byte chunks whose boundaries do not line up
//! with line or event boundaries. [`LineBuffer`] turns that chunk sequence
//! back into complete lines; [`classify`] tags each line so the assembler
//! knows what to do with it.
//!
//! SSE format:
//! ```text
//! : keep-alive
//!
//! data: {"key": "value"}
//!
//! data: [DONE]
//! ```

use bytes::BytesMut;

/// Accumulates raw stream bytes and yields complete newline-terminated lines.
///
/// Bytes with no trailing newline stay buffered until a later chunk completes
/// the line, so a line (or a JSON payload inside one) split across any number
/// of network reads is reassembled intact. Buffering is byte-oriented: a chunk
/// boundary falling inside a multi-byte UTF-8 sequence cannot corrupt the
/// line, because decoding happens only once a full line is available.
///
/// A line handed back via [`LineBuffer::requeue`] is replayed ahead of the
/// buffered bytes on the next call, exactly as if it had never been framed.
///
/// # Example
/// ```
/// use novachat::sse::LineBuffer;
///
/// let mut lines = LineBuffer::new();
/// lines.feed(b"data: {\"content\":\"hel");
/// assert_eq!(lines.next_line(), None); // no complete line yet
///
/// lines.feed(b"lo\"}\n");
/// assert_eq!(lines.next_line(), Some("data: {\"content\":\"hello\"}".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
    pending: Option<String>,
}

impl LineBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
            pending: None,
        }
    }

    /// Append one raw chunk of stream bytes.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pull the next complete line, if one is available.
    ///
    /// A re-queued line is returned first; after that, lines come out in
    /// arrival order. The terminating newline is consumed and a single
    /// trailing `\r` is stripped, so `\r\n`-terminated lines are identical
    /// to bare `\n`-terminated ones. Returns `None` once only an unterminated
    /// tail (or nothing) remains.
    pub fn next_line(&mut self) -> Option<String> {
        if let Some(line) = self.pending.take() {
            return Some(line);
        }

        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let framed = self.buf.split_to(pos + 1);
        let mut line = String::from_utf8_lossy(&framed[..pos]).into_owned();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Put a framed line back at the front of the buffer.
    ///
    /// The next [`LineBuffer::next_line`] call returns it again, before any
    /// bytes that arrived after it. Used when a data payload turns out to be
    /// incomplete and should be retried once more of the stream has arrived.
    pub fn requeue(&mut self, line: String) {
        self.pending = Some(line);
    }

    /// True when no re-queued line and no buffered bytes remain.
    pub fn is_empty(&self) -> bool {
        self.pending.is_none() && self.buf.is_empty()
    }
}

/// Classification of a single framed SSE line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Comment/keep-alive or blank line; carries no payload.
    Ignorable,
    /// A `data: ` line; holds the payload with surrounding whitespace trimmed.
    Data(&'a str),
    /// Any other non-empty line. Dropped silently by the caller; not an error.
    Unrecognized,
}

/// Classify one line of an SSE stream.
///
/// Trailing `\r` must already be stripped (the framer does this).
///
/// # Example
/// ```
/// use novachat::sse::{classify, SseLine};
///
/// assert!(matches!(classify(": keep-alive"), SseLine::Ignorable));
/// assert!(matches!(classify(""), SseLine::Ignorable));
/// assert!(matches!(classify("data: {\"a\":1}"), SseLine::Data("{\"a\":1}")));
/// assert!(matches!(classify("event: ping"), SseLine::Unrecognized));
/// ```
pub fn classify(line: &str) -> SseLine<'_> {
    if line.starts_with(':') {
        return SseLine::Ignorable;
    }
    if line.trim().is_empty() {
        return SseLine::Ignorable;
    }
    if let Some(payload) = line.strip_prefix("data: ") {
        return SseLine::Data(payload.trim());
    }
    SseLine::Unrecognized
}

/// Check if an SSE data payload is the terminal stream marker.
///
/// # Example
/// ```
/// use novachat::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker(""));
/// assert!(!is_done_marker("{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(payload: &str) -> bool {
    payload == "[DONE]"
}
