//! # MMDVM Frame Reassembly
//!
//! Byte-at-a-time reassembly of inbound frames.
//!
//! The host link has no checksum and no transport framing beyond the `0xE0`
//! start marker and the length byte, so resynchronisation is purely
//! marker-driven: bytes that arrive while no frame is in progress are dropped
//! unless they are a start marker.
//!
//! ```
//! use mmdvm_hostlink::mmdvm::frame::{FrameReassembler, Reassembly};
//!
//! let mut reassembler = FrameReassembler::new();
//! assert!(reassembler.feed(0xE0).is_none());
//! assert!(reassembler.feed(0x03).is_none());
//!
//! match reassembler.feed(0x01) {
//!     Some(Reassembly::Complete(frame)) => assert_eq!(frame.command(), 0x01),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use super::protocol::*;

/// Fixed-capacity accumulator for the frame currently being received
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    storage: [u8; MMDVM_MAX_FRAME_LENGTH],
    cursor: usize,
    expected_length: u8,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            storage: [0u8; MMDVM_MAX_FRAME_LENGTH],
            cursor: 0,
            expected_length: 0,
        }
    }

    /// Number of bytes received for the current frame
    pub fn len(&self) -> usize {
        self.cursor
    }

    /// True when no frame is in progress
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Buffer capacity (the largest legal frame)
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Latched length byte, or 0 before the second byte has arrived
    pub fn expected_length(&self) -> u8 {
        self.expected_length
    }

    /// Bytes received so far
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.cursor]
    }

    /// Append a byte; returns `false` and drops the byte when full
    pub fn push(&mut self, byte: u8) -> bool {
        if self.cursor >= self.storage.len() {
            return false;
        }
        self.storage[self.cursor] = byte;
        self.cursor += 1;
        true
    }

    /// Latch the expected frame length
    pub fn set_expected_length(&mut self, length: u8) {
        self.expected_length = length;
    }

    /// Discard the current frame
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.expected_length = 0;
    }
}

/// A complete inbound frame
///
/// Owns a copy of the frame bytes so the reassembler can start on the next
/// frame immediately.
#[derive(Clone, Copy)]
pub struct Frame {
    bytes: [u8; MMDVM_MAX_FRAME_LENGTH],
    len: usize,
}

impl Frame {
    /// Build a frame from raw bytes
    ///
    /// Returns `None` unless `bytes` holds a header and fits within the
    /// largest legal frame.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < MMDVM_HEADER_SIZE || bytes.len() > MMDVM_MAX_FRAME_LENGTH {
            return None;
        }

        let mut storage = [0u8; MMDVM_MAX_FRAME_LENGTH];
        storage[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            bytes: storage,
            len: bytes.len(),
        })
    }

    /// Raw command byte
    pub fn command(&self) -> u8 {
        self.bytes[2]
    }

    /// Payload after the three header bytes
    pub fn payload(&self) -> &[u8] {
        &self.bytes[MMDVM_HEADER_SIZE..self.len]
    }

    /// Whole frame including header
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Total frame length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: `from_bytes` refuses anything shorter than the header
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("command", &format_args!("0x{:02X}", self.command()))
            .field("payload", &format_args!("{:02X?}", self.payload()))
            .finish()
    }
}

/// Outcome of feeding a byte that finished (or killed) a frame
#[derive(Debug, Clone, Copy)]
pub enum Reassembly {
    /// All `length` bytes have arrived
    Complete(Frame),

    /// The frame was abandoned at its third byte; `command` is that byte
    Rejected { command: u8, error: ErrorCode },
}

/// Incremental frame reassembler
///
/// Call [`FrameReassembler::feed`] once per received byte. It never blocks and
/// holds at most one partial frame.
#[derive(Debug, Clone, Default)]
pub struct FrameReassembler {
    buffer: FrameBuffer,
}

impl FrameReassembler {
    /// Create a reassembler with an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: FrameBuffer::new(),
        }
    }

    /// Feed one byte
    ///
    /// Returns `Some` when this byte completed or rejected a frame; the
    /// buffer is empty again afterwards.
    pub fn feed(&mut self, byte: u8) -> Option<Reassembly> {
        if self.buffer.is_empty() {
            if byte == MMDVM_FRAME_START {
                self.buffer.push(byte);
            }
            return None;
        }

        // A latched length of at most 130 completes the frame before the buffer fills
        let stored = self.buffer.push(byte);
        debug_assert!(stored, "frame buffer overflow at {} bytes", self.buffer.len());
        let cursor = self.buffer.len();

        if cursor == 2 {
            self.buffer.set_expected_length(byte);
        }

        let expected = self.buffer.expected_length() as usize;

        if cursor == MMDVM_HEADER_SIZE {
            // Length is checked before the command byte is interpreted
            let error = if expected > MMDVM_MAX_FRAME_LENGTH {
                Some(ErrorCode::OversizeFrame)
            } else if expected < MMDVM_HEADER_SIZE {
                Some(ErrorCode::InvalidLength)
            } else {
                None
            };

            if let Some(error) = error {
                self.buffer.reset();
                return Some(Reassembly::Rejected {
                    command: byte,
                    error,
                });
            }
        }

        if cursor >= MMDVM_HEADER_SIZE && cursor == expected {
            let frame = Frame::from_bytes(self.buffer.as_slice());
            self.buffer.reset();
            return frame.map(Reassembly::Complete);
        }

        None
    }

    /// True while a frame is partially received
    pub fn in_progress(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Number of bytes held for the current frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.buffer.reset();
    }

    /// Read-only view of the frame buffer
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }
}
