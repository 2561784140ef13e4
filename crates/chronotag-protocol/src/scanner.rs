//! Stream scanner for tag report frames.
//!
//! This module provides a stateful scanner that reassembles fixed 21-byte
//! tag report frames from a raw serial byte stream. Serial reads do not
//! align to frame boundaries: a single read may contain a partial frame,
//! several frames, or a frame split across two reads, possibly preceded by
//! line noise. The scanner accumulates bytes in a persistent buffer and
//! extracts every valid frame it can, retaining the unconsumed suffix for
//! the next feed.
//!
//! # Resynchronization
//!
//! Tag report frames carry no start or end marker, so alignment is
//! recovered by sliding: the scanner takes the 21-byte window at the
//! current offset, and
//!
//! - if the window validates, consumes all 21 bytes and emits the read;
//! - if it does not, consumes exactly **one** byte and tries again.
//!
//! A single corrupted or offset byte therefore costs one byte of resync,
//! not a whole frame, and the scanner self-heals after transient
//! corruption:
//!
//! ```text
//! ┌────┬─────────────────────┬─────────────────────┬───────┐
//! │ FF │ valid frame (21 B)  │ valid frame (21 B)  │ tail  │
//! └────┴─────────────────────┴─────────────────────┴───────┘
//!   ▲ skipped (1 B)   ▲ consumed        ▲ consumed    ▲ retained
//! ```
//!
//! # Usage
//!
//! ```
//! use chronotag_protocol::FrameScanner;
//!
//! let mut scanner = FrameScanner::new(4);
//!
//! // A frame split across two reads
//! let mut frame = vec![0xA0, 0x13, 0x01, 0x00, 0x02, 0x00];
//! frame.extend_from_slice(&[0xE2; 12]); // EPC
//! frame.push(0xC5); // RSSI
//! frame.push(0x01); // antenna
//! frame.push(0x00);
//!
//! scanner.feed(&frame[..10]);
//! assert!(scanner.next_read().is_none());
//!
//! scanner.feed(&frame[10..]);
//! let read = scanner.next_read().unwrap();
//! assert_eq!(read.antenna.as_u8(), 1);
//! ```

use bytes::{Buf, BytesMut};
use std::collections::VecDeque;

use chronotag_core::constants::TAG_FRAME_LEN;

use crate::frame::TagRead;

/// Initial capacity for the ingestion buffer.
///
/// Sized for a typical burst of serial data; the buffer never retains more
/// than one partial frame between feeds, so this rarely reallocates.
const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Initial capacity for the queue of extracted reads.
const INITIAL_READ_QUEUE_CAPACITY: usize = 8;

/// Stateful scanner that turns raw serial chunks into validated tag reads.
///
/// The internal buffer survives across [`feed`](FrameScanner::feed) calls
/// and is never reset mid-stream; it grows only by fed bytes and shrinks
/// only by the prefix consumed as valid frames or skipped resync bytes.
/// After every scan the retained suffix is shorter than one frame, so
/// memory stays bounded without an explicit cap.
#[derive(Debug)]
pub struct FrameScanner {
    /// Persistent accumulator for incoming bytes.
    buffer: BytesMut,

    /// Antenna port count used to validate candidate windows.
    num_antennas: u8,

    /// Queue of validated reads ready for extraction.
    reads: VecDeque<TagRead>,

    /// Running count of bytes discarded by 1-byte resync steps.
    skipped: u64,
}

impl FrameScanner {
    /// Create a scanner validating against the given antenna port count.
    #[must_use]
    pub fn new(num_antennas: u8) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            num_antennas,
            reads: VecDeque::with_capacity(INITIAL_READ_QUEUE_CAPACITY),
            skipped: 0,
        }
    }

    /// Feed one chunk of raw serial data and scan for complete frames.
    ///
    /// All frames completed by this chunk are validated and queued; call
    /// [`next_read`](FrameScanner::next_read) or
    /// [`drain_reads`](FrameScanner::drain_reads) to consume them.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.scan();
    }

    /// Extract the next validated read, if any.
    pub fn next_read(&mut self) -> Option<TagRead> {
        self.reads.pop_front()
    }

    /// Returns an iterator that drains all currently queued reads.
    ///
    /// The iterator does not scan for more data; call
    /// [`feed`](FrameScanner::feed) first.
    pub fn drain_reads(&mut self) -> impl Iterator<Item = TagRead> + '_ {
        self.reads.drain(..)
    }

    /// Number of reads ready for extraction.
    #[must_use]
    pub fn reads_available(&self) -> usize {
        self.reads.len()
    }

    /// Number of unconsumed bytes retained for the next feed.
    ///
    /// Always less than one frame length after a scan.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Total bytes discarded so far by resync steps.
    #[must_use]
    pub fn skipped_bytes(&self) -> u64 {
        self.skipped
    }

    /// Scan the buffer from the front, consuming frames and resync bytes.
    ///
    /// When fewer than [`TAG_FRAME_LEN`] bytes remain, scanning stops and
    /// the buffer is trimmed by exactly the consumed prefix; the suffix is
    /// retained untouched for the next feed.
    fn scan(&mut self) {
        let mut offset = 0;

        while self.buffer.len() - offset >= TAG_FRAME_LEN {
            let window = &self.buffer[offset..offset + TAG_FRAME_LEN];
            match TagRead::parse(window, self.num_antennas) {
                Ok(read) => {
                    self.reads.push_back(read);
                    offset += TAG_FRAME_LEN;
                }
                Err(_) => {
                    // Not a frame boundary; slide by one byte.
                    offset += 1;
                    self.skipped += 1;
                }
            }
        }

        self.buffer.advance(offset);
    }
}
