//! Go-Back-N send-side state machine.
//!
//! [`GbnSender`] maintains a sliding window of up to `N` in-flight segments
//! over a byte stream that has already been split into fixed-size segments.
//!
//! # Protocol contract
//!
//! - At most `window_size` segments may be in flight at once.
//! - ACKs are **cumulative**: `ack_num = K` means the receiver has accepted
//!   every segment with index `<= K`, so `base` becomes `K + 1`.
//! - On timeout, the caller retransmits **all** in-flight segments from
//!   `base` onwards (go back to N).
//! - Segment indices are `u16` and never wrap: a stream may use at most
//!   [`MAX_SEGMENTS`] of them.
//!
//! This module only manages state; all socket I/O and the timer belong to
//! [`crate::gbn_transfer`].

use crate::error::{GbnError, Result};
use crate::frame::encode_data;

/// Most segments one stream may be split into.  Index `u16::MAX` is reserved.
pub const MAX_SEGMENTS: usize = u16::MAX as usize;

/// Split `data` into `max_segment_size` chunks.
///
/// Every chunk is full-sized except possibly the last.  Empty input yields a
/// single empty segment so the receiver still sees an end-of-stream marker.
/// Fails before anything is sent if the result would not fit the 16-bit
/// sequence space.
pub fn split_segments(data: &[u8], max_segment_size: usize) -> Result<Vec<Vec<u8>>> {
    if max_segment_size == 0 {
        return Err(GbnError::Config(
            "max segment size must be at least 1 byte".into(),
        ));
    }
    let segments = data.len().div_ceil(max_segment_size).max(1);
    if segments > MAX_SEGMENTS {
        return Err(GbnError::TooManySegments {
            segments,
            max: MAX_SEGMENTS,
        });
    }
    if data.is_empty() {
        return Ok(vec![Vec::new()]);
    }
    Ok(data.chunks(max_segment_size).map(<[u8]>::to_vec).collect())
}

/// A data frame the caller must hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    pub seq_num: u16,
    /// Encoded frame bytes.
    pub frame: Vec<u8>,
    /// `true` when this frame entered an empty window; the caller must
    /// (re)start the retransmission timer.
    pub opens_window: bool,
}

/// Result of feeding an ack to [`GbnSender::on_ack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// `base` moved forward by `newly_acked` segments.
    Advanced { newly_acked: usize },
    /// Ack for segments already confirmed; `base` unchanged.
    Stale,
    /// Ack for a segment never sent; ignored.
    Invalid,
}

/// Go-Back-N send-side state for one transfer.
///
/// ```text
///        base            next_seq
///          │                 │
///  ────────┼─────────────────┼──────────────┼────▶ segment index
///  acked   │ <── in flight ─▶│ <── usable ─▶│
///                                   base + window_size
/// ```
#[derive(Debug)]
pub struct GbnSender {
    segments: Vec<Vec<u8>>,
    stream_id: u16,
    /// Index of the oldest unacknowledged segment (left window edge).
    base: usize,
    /// Index of the next segment to transmit for the first time.
    next_seq: usize,
    window_size: usize,
}

impl GbnSender {
    /// Create a sender over `segments` with `base = next_seq = 0`.
    pub fn new(segments: Vec<Vec<u8>>, window_size: usize, stream_id: u16) -> Result<Self> {
        if segments.is_empty() {
            return Err(GbnError::Config("stream has no segments".into()));
        }
        if segments.len() > MAX_SEGMENTS {
            return Err(GbnError::TooManySegments {
                segments: segments.len(),
                max: MAX_SEGMENTS,
            });
        }
        if window_size == 0 {
            return Err(GbnError::Config("window size must be at least 1".into()));
        }
        Ok(Self {
            segments,
            stream_id,
            base: 0,
            next_seq: 0,
            window_size,
        })
    }

    pub fn base(&self) -> usize {
        self.base
    }

    pub fn next_seq(&self) -> usize {
        self.next_seq
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn stream_id(&self) -> u16 {
        self.stream_id
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.next_seq - self.base
    }

    pub fn window_is_empty(&self) -> bool {
        self.base == self.next_seq
    }

    /// `true` when the window has room and unsent segments remain.
    pub fn can_send(&self) -> bool {
        self.next_seq < self.base + self.window_size && self.next_seq < self.segments.len()
    }

    /// `true` once every segment, the final one included, is acknowledged.
    pub fn is_complete(&self) -> bool {
        self.base == self.segments.len()
    }

    fn encode(&self, index: usize) -> Vec<u8> {
        let is_last = index + 1 == self.segments.len();
        encode_data(index as u16, self.stream_id, &self.segments[index], is_last)
    }

    /// Take the next segment for first transmission, if the window allows.
    pub fn next_transmission(&mut self) -> Option<Transmission> {
        if !self.can_send() {
            return None;
        }
        let index = self.next_seq;
        let tx = Transmission {
            seq_num: index as u16,
            frame: self.encode(index),
            opens_window: self.window_is_empty(),
        };
        self.next_seq += 1;
        self.debug_check();
        Some(tx)
    }

    /// Process a cumulative ack naming the highest contiguously received index.
    pub fn on_ack(&mut self, ack_num: u16) -> AckOutcome {
        let acked_through = ack_num as usize;
        if acked_through >= self.next_seq {
            return AckOutcome::Invalid;
        }
        let new_base = acked_through + 1;
        if new_base <= self.base {
            return AckOutcome::Stale;
        }
        let newly_acked = new_base - self.base;
        self.base = new_base;
        self.debug_check();
        AckOutcome::Advanced { newly_acked }
    }

    /// Encoded frames for every in-flight segment, oldest first.
    ///
    /// Used on timeout to retransmit the whole window.
    pub fn window_frames(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        (self.base..self.next_seq).map(|index| self.encode(index))
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert!(
            self.base <= self.next_seq && self.next_seq <= self.base + self.window_size,
            "window invariant violated: base={} next_seq={} window={}",
            self.base,
            self.next_seq,
            self.window_size
        );
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
