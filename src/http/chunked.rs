//! Chunked transfer decoding
//!
//! The decoder is fed whatever the socket produced and hands back complete
//! chunks only. Chunk boundaries rarely line up with reads, so every step is
//! reentrant: when the buffer ends mid-size-line or mid-payload the decoder
//! answers [`DecodeStep::Incomplete`] and keeps the bytes for the next push.

use super::{Error, Result};
use bytes::{Buf, Bytes, BytesMut};

/// Longest size line accepted before the stream is considered garbage
pub const MAX_SIZE_LINE: usize = 1024;

/// Outcome of one decode attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStep {
    /// One complete chunk payload
    Data(Bytes),
    /// More input is needed before the next chunk can be produced
    Incomplete,
    /// The zero-size chunk was seen; the body is complete
    End,
}

/// Chunked decoder
///
/// Pending input lives in a `BytesMut`; consumed bytes are split off the
/// front rather than copied, so the buffer never gets resliced.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buffer: BytesMut,
    expect_crlf: bool,
    complete: bool,
}

impl ChunkDecoder {
    /// Create a new chunked decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    ///
    /// Input after the terminating chunk is ignored.
    pub fn push(&mut self, data: &[u8]) {
        if !self.complete {
            self.buffer.extend_from_slice(data);
        }
    }

    /// Try to take the next chunk off the buffer
    pub fn next_chunk(&mut self) -> Result<DecodeStep> {
        if self.complete {
            return Ok(DecodeStep::End);
        }

        if self.expect_crlf {
            match self.buffer.first().copied() {
                None => return Ok(DecodeStep::Incomplete),
                Some(b'\r') if self.buffer.len() < 2 => return Ok(DecodeStep::Incomplete),
                Some(b'\r') if self.buffer[1] == b'\n' => self.buffer.advance(2),
                // Tolerate a missing CRLF after the payload
                _ => {}
            }
            self.expect_crlf = false;
        }

        let line_end = match find_crlf(&self.buffer) {
            Some(pos) => pos,
            None if self.buffer.len() > MAX_SIZE_LINE => {
                return Err(Error::InvalidChunkSize(format!(
                    "no line break within {} bytes",
                    MAX_SIZE_LINE
                )));
            }
            None => return Ok(DecodeStep::Incomplete),
        };

        let size = parse_chunk_size(&self.buffer[..line_end])?;
        if size == 0 {
            self.complete = true;
            self.buffer.clear();
            return Ok(DecodeStep::End);
        }

        let payload_start = line_end + 2;
        if self.buffer.len() - payload_start < size {
            return Ok(DecodeStep::Incomplete);
        }

        self.buffer.advance(payload_start);
        let payload = self.buffer.split_to(size).freeze();
        self.expect_crlf = true;
        Ok(DecodeStep::Data(payload))
    }

    /// Check if the terminating chunk has been seen
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Bytes received but not yet decoded
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Parse a chunk size line, ignoring any `;extension`
fn parse_chunk_size(line: &[u8]) -> Result<usize> {
    let digits = line
        .split(|&b| b == b';')
        .next()
        .unwrap_or_default()
        .trim_ascii();

    std::str::from_utf8(digits)
        .ok()
        .filter(|s| !s.is_empty())
        .and_then(|s| usize::from_str_radix(s, 16).ok())
        .ok_or_else(|| Error::InvalidChunkSize(String::from_utf8_lossy(line).into_owned()))
}

/// Find CRLF in buffer
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Decode complete chunked body from bytes
pub fn decode_chunked_body(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ChunkDecoder::new();
    let mut output = Vec::new();
    decoder.push(input);

    loop {
        match decoder.next_chunk()? {
            DecodeStep::Data(chunk) => output.extend_from_slice(&chunk),
            DecodeStep::Incomplete => return Err(Error::Protocol("incomplete chunked body".to_string())),
            DecodeStep::End => return Ok(output),
        }
    }
}
