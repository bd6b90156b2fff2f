//! Line framing for NDJSON response bodies.
//!
//! Transport chunks arrive at arbitrary byte offsets: a JSON object can span
//! several chunks and a multi-byte character can be cut in half. The framer
//! hides that by decoding incrementally and only handing out text once a
//! `\n` delimiter has been seen.

use memchr::memchr;

const REPLACEMENT: char = '\u{FFFD}';

/// Stateful UTF-8 decoder.
///
/// Bytes of a character that is still incomplete at the end of a chunk are
/// held back and completed by the next call. Invalid sequences decode to
/// U+FFFD instead of failing the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    partial: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes held back from previous chunks (at most 3).
    pub fn pending_bytes(&self) -> usize {
        self.partial.len()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let joined;
        let mut input: &[u8] = if self.partial.is_empty() {
            bytes
        } else {
            self.partial.extend_from_slice(bytes);
            joined = std::mem::take(&mut self.partial);
            &joined
        };

        let mut out = String::with_capacity(input.len());
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&input[..valid]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            input = &input[valid + len..];
                        }
                        None => {
                            self.partial.extend_from_slice(&input[valid..]);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of input. A dangling partial character becomes U+FFFD.
    pub fn finish(self) -> String {
        if self.partial.is_empty() {
            String::new()
        } else {
            REPLACEMENT.to_string()
        }
    }
}

/// Splits a chunked byte stream into `\n`-terminated lines.
///
/// The delimiter is stripped; nothing else is. A `\r` before the delimiter
/// stays in the line (JSON treats it as whitespace).
#[derive(Debug, Default)]
pub struct LineFramer {
    decoder: Utf8Decoder,
    pending: String,
    lines_emitted: usize,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one chunk and return every line it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // Everything already pending is newline-free, so only the new text
        // needs scanning.
        let mut search_from = self.pending.len();
        let text = self.decoder.decode(chunk);
        self.pending.push_str(&text);

        let mut lines = Vec::new();
        let mut line_start = 0;
        while let Some(offset) = memchr(b'\n', &self.pending.as_bytes()[search_from..]) {
            let newline = search_from + offset;
            lines.push(self.pending[line_start..newline].to_string());
            line_start = newline + 1;
            search_from = line_start;
        }

        if line_start > 0 {
            self.pending.drain(..line_start);
        }
        self.lines_emitted += lines.len();
        lines
    }

    /// Text received since the last delimiter.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn lines_emitted(&self) -> usize {
        self.lines_emitted
    }

    /// End of stream. Returns the unterminated tail, if any.
    ///
    /// The tail is never a line: every object a well-behaved producer writes
    /// ends with `\n`, so leftover text is a truncated object.
    pub fn finish(self) -> Option<String> {
        let LineFramer {
            decoder,
            mut pending,
            ..
        } = self;
        pending.push_str(&decoder.finish());
        if pending.is_empty() {
            None
        } else {
            Some(pending)
        }
    }
}
