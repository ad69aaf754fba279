//! Frame Reader
//!
//! Turns arbitrarily-chunked bytes into complete lines. A trailing partial
//! line is carried over to the next chunk, so chunk boundaries never change
//! the sequence of lines produced.
//!
//! Bytes are decoded to text before framing. Latin-5 decoding cannot fail.
//! UTF-8 decoding holds back an incomplete multi-byte sequence at the end of
//! a chunk until the next chunk completes it; genuinely invalid bytes drop
//! the whole chunk, along with any held-back bytes it failed to complete,
//! and leave the carry-over untouched.

use crate::infrastructure::config::FeedEncoding;

use super::protocol::LINE_TERMINATOR;

/// A chunk could not be decoded as text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// Invalid byte sequence for the configured encoding.
    #[error("invalid {encoding} byte sequence at offset {offset}")]
    InvalidEncoding {
        /// Encoding name.
        encoding: &'static str,
        /// Offset of the first invalid byte within the chunk.
        offset: usize,
    },
}

// =============================================================================
// Chunk Decoder
// =============================================================================

/// Stateful bytes-to-text decoder.
#[derive(Debug, Clone)]
pub struct ChunkDecoder {
    encoding: FeedEncoding,
    pending: Vec<u8>,
}

impl ChunkDecoder {
    /// Create a decoder for the given encoding.
    #[must_use]
    pub const fn new(encoding: FeedEncoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    /// Decode one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::InvalidEncoding`] when the chunk holds an
    /// invalid sequence. Pending bytes from earlier chunks are kept.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, FramingError> {
        match self.encoding {
            FeedEncoding::Latin5 => Ok(chunk.iter().map(|&b| latin5_char(b)).collect()),
            FeedEncoding::Utf8 => self.decode_utf8(chunk),
        }
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> Result<String, FramingError> {
        let mut bytes = self.pending.clone();
        bytes.extend_from_slice(chunk);

        match std::str::from_utf8(&bytes) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&bytes[..valid]).into_owned();
                self.pending = bytes[valid..].to_vec();
                Ok(text)
            }
            Err(e) => {
                let offset = e.valid_up_to().saturating_sub(self.pending.len());
                self.pending.clear();
                Err(FramingError::InvalidEncoding {
                    encoding: FeedEncoding::Utf8.as_str(),
                    offset,
                })
            }
        }
    }
}

/// ISO-8859-9 is ISO-8859-1 with six Turkish letters swapped in.
const fn latin5_char(byte: u8) -> char {
    match byte {
        0xD0 => 'Ğ',
        0xDD => 'İ',
        0xDE => 'Ş',
        0xF0 => 'ğ',
        0xFD => 'ı',
        0xFE => 'ş',
        b => b as char,
    }
}

// =============================================================================
// Frame Reader
// =============================================================================

/// Accumulates chunks and yields complete lines in wire order.
#[derive(Debug, Clone)]
pub struct FrameReader {
    decoder: ChunkDecoder,
    carry_over: String,
}

impl FrameReader {
    /// Create a reader with an empty carry-over.
    #[must_use]
    pub const fn new(encoding: FeedEncoding) -> Self {
        Self {
            decoder: ChunkDecoder::new(encoding),
            carry_over: String::new(),
        }
    }

    /// Current partial line.
    #[must_use]
    pub fn carry_over(&self) -> &str {
        &self.carry_over
    }

    /// Feed one chunk and collect the complete lines it finishes.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError`] if the chunk cannot be decoded. The chunk is
    /// dropped and the carry-over is left unchanged.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, FramingError> {
        let mut lines = Vec::new();
        self.push_with(chunk, |line| lines.push(line.to_string()))?;
        Ok(lines)
    }

    /// Feed one chunk and hand each complete line to `on_line`, in order.
    ///
    /// Empty lines are skipped and a trailing `\r` is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError`] if the chunk cannot be decoded.
    pub fn push_with(
        &mut self,
        chunk: &[u8],
        mut on_line: impl FnMut(&str),
    ) -> Result<(), FramingError> {
        let text = self.decoder.decode(chunk)?;

        let mut combined = std::mem::take(&mut self.carry_over);
        combined.push_str(&text);

        let Some(last) = combined.rfind(LINE_TERMINATOR) else {
            self.carry_over = combined;
            return Ok(());
        };

        let (complete, rest) = combined.split_at(last + LINE_TERMINATOR.len_utf8());
        for line in complete.split(LINE_TERMINATOR) {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if !line.is_empty() {
                on_line(line);
            }
        }
        self.carry_over = rest.to_string();
        Ok(())
    }
}
