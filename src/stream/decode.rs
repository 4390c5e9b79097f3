//! # Incremental UTF-8 Decoding
//!
//! Network chunk boundaries land anywhere, including in the middle of a
//! multi-byte code point. [`Utf8Decoder`] carries the incomplete trailing
//! bytes of one chunk into the next, so the decoded text is identical to
//! what decoding the unsplit byte sequence would produce. Interior byte
//! sequences that can never become valid UTF-8 are replaced with U+FFFD
//! rather than dropped.

/// Stateful byte-to-text decoder for one stream.
///
/// Holds at most the 3 pending bytes of an incomplete trailing code point
/// between calls. No I/O, no shared state; one decoder per stream,
/// discarded when the stream ends.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: [u8; 4],
    pending_len: usize,
    bytes_processed: u64,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes fed in so far, including pending ones.
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Decode the next chunk, prefixing any bytes held over from the
    /// previous call. Never fails: incomplete trailing sequences are kept
    /// for the next call, invalid interior sequences become U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.bytes_processed += chunk.len() as u64;

        let carried;
        let bytes: &[u8] = if self.pending_len == 0 {
            chunk
        } else {
            let mut joined = Vec::with_capacity(self.pending_len + chunk.len());
            joined.extend_from_slice(&self.pending[..self.pending_len]);
            joined.extend_from_slice(chunk);
            self.pending_len = 0;
            carried = joined;
            &carried
        };

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(invalid_len) => {
                            out.push('\u{FFFD}');
                            rest = &tail[invalid_len..];
                        }
                        None => {
                            // Incomplete trailing code point, at most 3 bytes.
                            self.pending[..tail.len()].copy_from_slice(tail);
                            self.pending_len = tail.len();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at stream end. Bytes that never completed a code point become
    /// a single replacement character instead of being silently dropped.
    pub fn finish(&mut self) -> String {
        if self.pending_len == 0 {
            return String::new();
        }
        self.pending_len = 0;
        '\u{FFFD}'.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkmark_split_across_chunks() {
        let mut decoder = Utf8Decoder::new();
        // U+2713 is e2 9c 93, split 2+1 with trailing ASCII.
        let first = decoder.decode(b"\xe2\x9c");
        let second = decoder.decode(b"\x93 done");

        assert_eq!(first, "");
        assert_eq!(second, "\u{2713} done");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn four_byte_emoji_split_two_plus_two() {
        let mut decoder = Utf8Decoder::new();
        let emoji = "🎉".as_bytes(); // f0 9f 8e 89

        let first = decoder.decode(&emoji[..2]);
        let second = decoder.decode(&emoji[2..]);

        assert_eq!(first, "");
        assert_eq!(second, "🎉");
    }

    #[test]
    fn every_split_offset_reassembles_losslessly() {
        let text = "naïve ✓ 日本語 🎉 plain";
        let bytes = text.as_bytes();

        for split in 0..=bytes.len() {
            let mut decoder = Utf8Decoder::new();
            let mut reassembled = decoder.decode(&bytes[..split]);
            reassembled.push_str(&decoder.decode(&bytes[split..]));
            reassembled.push_str(&decoder.finish());
            assert_eq!(reassembled, text, "split at byte {split}");
        }
    }

    #[test]
    fn three_way_splits_reassemble_losslessly() {
        let text = "ab🎉cd✓";
        let bytes = text.as_bytes();

        for i in 0..=bytes.len() {
            for j in i..=bytes.len() {
                let mut decoder = Utf8Decoder::new();
                let mut reassembled = decoder.decode(&bytes[..i]);
                reassembled.push_str(&decoder.decode(&bytes[i..j]));
                reassembled.push_str(&decoder.decode(&bytes[j..]));
                reassembled.push_str(&decoder.finish());
                assert_eq!(reassembled, text, "splits at {i},{j}");
            }
        }
    }

    #[test]
    fn invalid_interior_byte_becomes_replacement_char() {
        let mut decoder = Utf8Decoder::new();
        let decoded = decoder.decode(b"ok\xffstill ok");
        assert_eq!(decoded, "ok\u{FFFD}still ok");
    }

    #[test]
    fn truncated_sequence_at_stream_end_is_not_dropped() {
        let mut decoder = Utf8Decoder::new();
        // First two bytes of a four-byte sequence, then the stream ends.
        assert_eq!(decoder.decode(b"hi\xf0\x9f"), "hi");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn empty_chunks_are_harmless() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b""), "");
        assert_eq!(decoder.decode("é".as_bytes()), "é");
        assert_eq!(decoder.decode(b""), "");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn counts_processed_bytes() {
        let mut decoder = Utf8Decoder::new();
        decoder.decode(b"abc");
        decoder.decode("✓".as_bytes());
        assert_eq!(decoder.bytes_processed(), 6);
    }
}
