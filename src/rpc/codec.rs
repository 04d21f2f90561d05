//! Terminator-delimited frame codec.
//!
//! Wire format:
//! ```text
//! ┌──────────────────────────┬──────┐
//! │ Message payload (N B)    │ 0x00 │
//! │ never contains 0x00      │      │
//! └──────────────────────────┴──────┘
//! ```
//!
//! There is no length field. The decoder accumulates incoming bytes and
//! yields one frame per terminator seen. A single `Transport::read` may
//! return part of a frame or several frames concatenated; the trailing
//! partial frame stays buffered until its terminator arrives.

use log::warn;

use crate::error::FrameError;

/// End-of-frame marker.
pub const TERMINATOR: u8 = 0x00;

/// Default cap on a buffered frame (protects against memory exhaustion
/// when the terminator is lost).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024;

/// One serialized message, terminator stripped.
pub type Frame = Vec<u8>;

/// Streaming frame decoder.
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Length of the buffered prefix that ends with a terminator.
    complete_len: usize,
    max_frame_size: usize,
    /// Set after an overflow: discard everything up to the next terminator.
    resyncing: bool,
    dropped_bytes: u64,
}

impl FrameDecoder {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            buf: Vec::new(),
            complete_len: 0,
            max_frame_size,
            resyncing: false,
            dropped_bytes: 0,
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns a lazy iterator over every frame completed so far. Frames
    /// not pulled from the iterator stay buffered for the next call.
    pub fn feed(&mut self, data: &[u8]) -> Frames<'_> {
        for &byte in data {
            if self.resyncing {
                self.dropped_bytes += 1;
                if byte == TERMINATOR {
                    self.resyncing = false;
                }
                continue;
            }

            self.buf.push(byte);
            if byte == TERMINATOR {
                self.complete_len = self.buf.len();
                continue;
            }

            if self.pending_len() > self.max_frame_size {
                warn!(
                    "codec: frame exceeds {} bytes, discarding until next terminator",
                    self.max_frame_size
                );
                self.dropped_bytes += self.pending_len() as u64;
                self.buf.truncate(self.complete_len);
                self.resyncing = true;
            }
        }

        Frames { decoder: self }
    }

    /// Number of bytes held for a frame that has not terminated yet.
    pub fn pending_len(&self) -> usize {
        self.buf.len() - self.complete_len
    }

    /// Total bytes discarded by overflow resynchronisation.
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }

    /// Reset decoder state (e.g. after a transport reconnect).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.complete_len = 0;
        self.resyncing = false;
    }

    fn next_frame(&mut self) -> Option<Frame> {
        let end = self.buf[..self.complete_len]
            .iter()
            .position(|&b| b == TERMINATOR)?;
        let mut frame: Frame = self.buf.drain(..=end).collect();
        frame.pop();
        self.complete_len -= end + 1;
        Some(frame)
    }
}

/// Iterator over frames completed by [`FrameDecoder::feed`].
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.decoder.next_frame()
    }
}

/// Lazily split a byte stream into frames.
///
/// Bytes are pulled from `bytes` only as far as needed to complete the
/// next frame. A partial frame left when the stream ends is discarded.
pub fn decode<I>(bytes: I) -> Decode<I::IntoIter>
where
    I: IntoIterator<Item = u8>,
{
    Decode {
        bytes: bytes.into_iter(),
    }
}

/// Iterator returned by [`decode`].
pub struct Decode<I> {
    bytes: I,
}

impl<I: Iterator<Item = u8>> Iterator for Decode<I> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let mut frame = Frame::new();
        for byte in self.bytes.by_ref() {
            if byte == TERMINATOR {
                return Some(frame);
            }
            frame.push(byte);
        }
        None
    }
}

/// Encode a message payload into a terminated frame.
///
/// Rejects payloads that contain the terminator rather than emitting a
/// frame the peer would split in two.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.contains(&TERMINATOR) {
        return Err(FrameError::TerminatorInPayload);
    }

    let mut out = Vec::with_capacity(payload.len() + 1);
    out.extend_from_slice(payload);
    out.push(TERMINATOR);
    Ok(out)
}
