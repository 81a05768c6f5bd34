//! Stream framing.
//!
//! TCP delivers bytes, not frames. [`FrameDecoder`] buffers the stream and
//! hands out complete `8=...10=xxx<SOH>` frames using the declared BodyLength.
//! Bytes that cannot start a frame are skipped so one corrupted frame does not
//! take the session down.

use crate::error::{ProtocolError, ProtocolResult};
use bytes::{Bytes, BytesMut};
use fix_types::SOH;
use tracing::debug;

const FRAME_START: &[u8] = b"8=FIX";
/// `10=nnn<SOH>`
const TRAILER_LEN: usize = 7;
const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

pub struct FrameDecoder {
    buffer: BytesMut,
    max_frame: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME)
    }
}

impl FrameDecoder {
    pub fn new(max_frame: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            max_frame,
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Mutable access for reading straight from a socket.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Next complete frame, `Ok(None)` when more bytes are needed.
    ///
    /// A recoverable error means bytes were discarded; calling again continues
    /// with the rest of the stream.
    pub fn next_frame(&mut self) -> ProtocolResult<Option<Bytes>> {
        let start = match find(&self.buffer, FRAME_START) {
            Some(pos) => pos,
            None => {
                // Keep a possible partial "8=FIX" prefix at the tail.
                let keep = FRAME_START.len() - 1;
                if self.buffer.len() > keep {
                    let skipped = self.buffer.len() - keep;
                    let _ = self.buffer.split_to(skipped);
                    debug!(skipped, "Discarded bytes with no frame start");
                    return Err(ProtocolError::Garbled { skipped });
                }
                return Ok(None);
            }
        };
        if start > 0 {
            let _ = self.buffer.split_to(start);
            debug!(skipped = start, "Discarded bytes before frame start");
            return Err(ProtocolError::Garbled { skipped: start });
        }

        let Some(first_soh) = find_byte(&self.buffer, SOH, 0) else {
            return self.need_more();
        };
        let length_field = first_soh + 1;
        if self.buffer.len() < length_field + 2 {
            return self.need_more();
        }
        if &self.buffer[length_field..length_field + 2] != b"9=" {
            return Err(self.skip_start());
        }
        let Some(length_end) = find_byte(&self.buffer, SOH, length_field) else {
            return self.need_more();
        };
        let body_len = match std::str::from_utf8(&self.buffer[length_field + 2..length_end])
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            Some(len) => len,
            None => return Err(self.skip_start()),
        };

        let body_start = length_end + 1;
        let total = body_start + body_len + TRAILER_LEN;
        if total > self.max_frame {
            let size = total;
            self.skip_start();
            return Err(ProtocolError::FrameTooLarge {
                size,
                limit: self.max_frame,
            });
        }
        if self.buffer.len() < total {
            return Ok(None);
        }

        let trailer = &self.buffer[body_start + body_len..total];
        if !trailer.starts_with(b"10=") || trailer[TRAILER_LEN - 1] != SOH {
            return Err(self.skip_start());
        }

        Ok(Some(self.buffer.split_to(total).freeze()))
    }

    fn need_more(&mut self) -> ProtocolResult<Option<Bytes>> {
        if self.buffer.len() > self.max_frame {
            let size = self.buffer.len();
            self.skip_start();
            return Err(ProtocolError::FrameTooLarge {
                size,
                limit: self.max_frame,
            });
        }
        Ok(None)
    }

    /// Drop the current frame start so the search resumes past it.
    fn skip_start(&mut self) -> ProtocolError {
        let skipped = FRAME_START.len().min(self.buffer.len());
        let _ = self.buffer.split_to(skipped);
        ProtocolError::Garbled { skipped }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn find_byte(haystack: &[u8], byte: u8, from: usize) -> Option<usize> {
    haystack[from..].iter().position(|b| *b == byte).map(|p| p + from)
}
