//! # Wire Framing
//!
//! Upstream providers deliver token streams in one of two framings:
//! Server-Sent Events (blank-line delimited event blocks) or
//! newline-delimited JSON. [`FrameBuffer`] reassembles complete frames out
//! of decoded text that arrives in arbitrary slices, and [`detect_format`]
//! classifies the framing from the first content of the stream.

use tracing::debug;

/// The framing convention of one upstream stream. Decided once from the
/// first non-trivial content and cached for the stream's lifetime; a
/// mid-stream change of framing is a protocol violation and is never
/// honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Not yet decidable from the bytes seen so far
    Unknown,
    /// Server-Sent Events: frames end at a blank line
    Sse,
    /// Newline-delimited JSON: one frame per line
    Ndjson,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Unknown => "unknown",
            WireFormat::Sse => "sse",
            WireFormat::Ndjson => "ndjson",
        }
    }
}

/// Classify the stream's framing from its earliest buffered text.
///
/// SSE markers are checked first: a leading comment line or any `data:`
/// token classifies the stream as SSE. Otherwise, once a complete first
/// line is available the stream is NDJSON (valid JSON or not - a broken
/// first line is still line-framed, and the parser deals with it). With
/// neither a marker nor a full line the sample is inconclusive and
/// detection waits for more bytes, unless `last` is set, in which case an
/// undetected non-empty stream defaults to NDJSON.
pub fn detect_format(sample: &str, last: bool) -> WireFormat {
    let sample = sample.trim_start_matches('\u{feff}');
    if sample.is_empty() {
        return WireFormat::Unknown;
    }

    if sample.starts_with(':')
        || sample.starts_with("event:")
        || sample.starts_with("id:")
        || sample.starts_with("retry:")
        || sample.contains("data:")
    {
        return WireFormat::Sse;
    }

    if sample.contains('\n') || last {
        return WireFormat::Ndjson;
    }

    WireFormat::Unknown
}

/// Reassembles complete wire frames from decoded text.
///
/// Text is appended as it arrives; `extract` splits off every complete
/// frame in arrival order and keeps the unterminated remainder buffered.
/// After any `extract` call the buffer holds either nothing or a strict
/// prefix of a frame still in flight.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: String,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The buffered text, for format detection.
    pub fn sample(&self) -> &str {
        &self.buf
    }

    /// Split off all complete frames, oldest first. With `last` set (the
    /// upstream has closed) a non-empty unterminated remainder is emitted
    /// as one final frame so a missing trailing delimiter cannot swallow
    /// data.
    pub fn extract(&mut self, format: WireFormat, last: bool) -> Vec<String> {
        let mut frames = Vec::new();

        match format {
            WireFormat::Sse => {
                while let Some((at, delimiter_len)) = Self::earliest_blank_line(&self.buf) {
                    let frame = self.buf[..at].to_string();
                    self.buf.drain(..at + delimiter_len);
                    if !frame.trim().is_empty() {
                        frames.push(frame);
                    }
                }
            }
            WireFormat::Ndjson => {
                while let Some(at) = self.buf.find('\n') {
                    let line = self.buf[..at].trim_end_matches('\r').to_string();
                    self.buf.drain(..=at);
                    if !line.trim().is_empty() {
                        frames.push(line);
                    }
                }
            }
            WireFormat::Unknown => {
                debug!("frame extraction deferred, wire format not yet detected");
            }
        }

        if last && !self.buf.is_empty() {
            let remainder = std::mem::take(&mut self.buf);
            if !remainder.trim().is_empty() {
                frames.push(remainder);
            }
        }

        frames
    }

    /// Position and length of the earliest SSE frame delimiter, accepting
    /// both `\n\n` and `\r\n\r\n`.
    fn earliest_blank_line(buf: &str) -> Option<(usize, usize)> {
        let lf = buf.find("\n\n").map(|at| (at, 2));
        let crlf = buf.find("\r\n\r\n").map(|at| (at, 4));
        match (lf, crlf) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (some, None) => some,
            (None, some) => some,
        }
    }
}
