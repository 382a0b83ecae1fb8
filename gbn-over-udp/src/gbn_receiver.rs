//! Go-Back-N receive-side state machine.
//!
//! [`GbnReceiver`] implements the receiver side of Go-Back-N:
//!
//! - Every inbound datagram first goes through the [`LossSimulator`]; a
//!   dropped datagram has no effect at all.
//! - Only the **in-order** segment (`seq == expected_seq`) is accepted; its
//!   payload is appended to the reassembly buffer and acknowledged.
//! - Out-of-order and duplicate segments are discarded and answered with a
//!   **cumulative ACK** for the last accepted segment.  Before anything has
//!   been accepted there is no such segment, and no ACK is produced.
//! - Accepting the segment marked `is_last` completes the stream.
//!
//! This module only manages state; the caller sends the returned ACKs (same
//! pattern as [`crate::gbn_sender::GbnSender`]).

use crate::frame::{AckFrame, DataFrame, FrameError};
use crate::simulator::LossSimulator;
use crate::stats::ReceiverStats;

/// Receiver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverState {
    /// Transfer in progress.
    #[default]
    AwaitingSegment,
    /// The final segment has been accepted.
    Complete,
}

/// What happened to one inbound datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Dropped by the loss simulator.
    Lost,
    /// Failed to decode; dropped.
    Malformed(FrameError),
    /// In-order segment appended.  `completed` carries the whole stream when
    /// this was the final segment.
    Accepted {
        ack: AckFrame,
        completed: Option<Vec<u8>>,
    },
    /// Out-of-order or duplicate segment thrown away.
    Discarded { ack: Option<AckFrame> },
}

impl Delivery {
    /// The ack to send back, if any.
    pub fn ack(&self) -> Option<AckFrame> {
        match self {
            Delivery::Accepted { ack, .. } => Some(*ack),
            Delivery::Discarded { ack } => *ack,
            Delivery::Lost | Delivery::Malformed(_) => None,
        }
    }
}

/// Go-Back-N receive-side state for one transfer.
#[derive(Debug)]
pub struct GbnReceiver {
    state: ReceiverState,
    /// Index of the next in-order segment.
    expected_seq: u32,
    /// In-order payload bytes reassembled so far.
    assembled: Vec<u8>,
    simulator: LossSimulator,
    stats: ReceiverStats,
}

impl Default for GbnReceiver {
    fn default() -> Self {
        Self::new(LossSimulator::disabled())
    }
}

impl GbnReceiver {
    pub fn new(simulator: LossSimulator) -> Self {
        Self {
            state: ReceiverState::AwaitingSegment,
            expected_seq: 0,
            assembled: Vec::new(),
            simulator,
            stats: ReceiverStats::default(),
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ReceiverState::Complete
    }

    pub fn expected_seq(&self) -> u32 {
        self.expected_seq
    }

    /// Bytes reassembled so far (empty once the stream has been handed off).
    pub fn assembled(&self) -> &[u8] {
        &self.assembled
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    /// Cumulative ack for the last accepted segment, if any.
    fn last_good_ack(&self, stream_id: u16) -> Option<AckFrame> {
        self.expected_seq
            .checked_sub(1)
            .map(|last| AckFrame::new(last as u16, stream_id))
    }

    /// Process one raw inbound datagram.
    pub fn on_frame_arrived(&mut self, raw: &[u8]) -> Delivery {
        self.stats.frames_received += 1;
        if self.stats.started_at.is_none() {
            self.stats.started_at = Some(std::time::Instant::now());
        }

        if self.simulator.should_drop() {
            self.stats.frames_lost += 1;
            log::debug!("[gbn] ✗ simulated loss ({} bytes)", raw.len());
            return Delivery::Lost;
        }

        let frame = match DataFrame::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.frames_malformed += 1;
                log::warn!("[gbn] dropping malformed frame: {e}");
                return Delivery::Malformed(e);
            }
        };

        let delivery = self.on_frame(frame);
        if delivery.ack().is_some() {
            self.stats.acks_sent += 1;
        }
        delivery
    }

    fn on_frame(&mut self, frame: DataFrame) -> Delivery {
        if self.state == ReceiverState::AwaitingSegment
            && u32::from(frame.seq_num) == self.expected_seq
        {
            self.assembled.extend_from_slice(&frame.payload);
            self.stats.frames_accepted += 1;
            self.stats.bytes_delivered += frame.payload.len() as u64;
            let ack = AckFrame::new(frame.seq_num, frame.stream_id);
            self.expected_seq += 1;
            log::debug!(
                "[gbn] ← DATA seq={} len={} accepted; → ACK {}",
                frame.seq_num,
                frame.payload.len(),
                ack.ack_num
            );

            let completed = if frame.is_last {
                self.state = ReceiverState::Complete;
                self.stats.finished_at = Some(std::time::Instant::now());
                log::info!(
                    "[gbn] stream {} complete: {} segments, {} bytes",
                    frame.stream_id,
                    self.expected_seq,
                    self.assembled.len()
                );
                Some(std::mem::take(&mut self.assembled))
            } else {
                None
            };
            return Delivery::Accepted { ack, completed };
        }

        self.stats.frames_discarded += 1;
        let ack = self.last_good_ack(frame.stream_id);
        log::debug!(
            "[gbn] ← DATA seq={} discarded (expected {}); → ACK {:?}",
            frame.seq_num,
            self.expected_seq,
            ack.map(|a| a.ack_num)
        );
        Delivery::Discarded { ack }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_data;

    fn data(seq: u16, payload: &[u8], is_last: bool) -> Vec<u8> {
        encode_data(seq, 0, payload, is_last)
    }

    fn ack_num(d: &Delivery) -> Option<u16> {
        d.ack().map(|a| a.ack_num)
    }

    #[test]
    fn initial_state() {
        let r = GbnReceiver::default();
        assert_eq!(r.expected_seq(), 0);
        assert_eq!(r.state(), ReceiverState::AwaitingSegment);
        assert!(r.assembled().is_empty());
    }

    #[test]
    fn in_order_segment_accepted_and_acked() {
        let mut r = GbnReceiver::default();
        let d = r.on_frame_arrived(&data(0, b"0123", false));
        assert_eq!(
            d,
            Delivery::Accepted {
                ack: AckFrame::new(0, 0),
                completed: None
            }
        );
        assert_eq!(r.expected_seq(), 1);
        assert_eq!(r.assembled(), b"0123");
    }

    #[test]
    fn final_segment_completes_stream() {
        let mut r = GbnReceiver::default();
        r.on_frame_arrived(&data(0, b"0123", false));
        r.on_frame_arrived(&data(1, b"4567", false));
        let d = r.on_frame_arrived(&data(2, b"89", true));
        match d {
            Delivery::Accepted {
                ack,
                completed: Some(bytes),
            } => {
                assert_eq!(ack.ack_num, 2);
                assert_eq!(bytes, b"0123456789");
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(r.is_complete());
        assert_eq!(r.stats().frames_accepted, 3);
    }

    #[test]
    fn out_of_order_before_first_accept_sends_no_ack() {
        let mut r = GbnReceiver::default();
        let d = r.on_frame_arrived(&data(1, b"later", false));
        assert_eq!(d, Delivery::Discarded { ack: None });
        assert_eq!(r.expected_seq(), 0);
        assert_eq!(r.stats().acks_sent, 0);
    }

    #[test]
    fn out_of_order_reacks_last_good() {
        let mut r = GbnReceiver::default();
        r.on_frame_arrived(&data(0, b"aa", false));
        let d = r.on_frame_arrived(&data(2, b"cc", false)); // 1 missing
        assert_eq!(ack_num(&d), Some(0));
        assert_eq!(r.expected_seq(), 1);
        assert_eq!(r.assembled(), b"aa");
    }

    #[test]
    fn duplicate_is_idempotent() {
        let mut r = GbnReceiver::default();
        r.on_frame_arrived(&data(0, b"aa", false));
        r.on_frame_arrived(&data(1, b"bb", false));
        let before = (r.expected_seq(), r.assembled().to_vec());

        for _ in 0..3 {
            let d = r.on_frame_arrived(&data(0, b"aa", false));
            assert_eq!(ack_num(&d), Some(1));
        }
        assert_eq!((r.expected_seq(), r.assembled().to_vec()), before);
        assert_eq!(r.stats().frames_discarded, 3);
    }

    #[test]
    fn complete_receiver_reacks_final_segment() {
        let mut r = GbnReceiver::default();
        r.on_frame_arrived(&data(0, b"x", true));
        let d = r.on_frame_arrived(&data(0, b"x", true));
        assert_eq!(d, Delivery::Discarded { ack: Some(AckFrame::new(0, 0)) });
    }

    #[test]
    fn ack_echoes_stream_id() {
        let mut r = GbnReceiver::default();
        let d = r.on_frame_arrived(&encode_data(0, 7, b"s", false));
        assert_eq!(d.ack(), Some(AckFrame::new(0, 7)));
    }

    #[test]
    fn malformed_frame_dropped_without_ack() {
        let mut r = GbnReceiver::default();
        let d = r.on_frame_arrived(&[1, 2, 3]);
        assert!(matches!(d, Delivery::Malformed(FrameError::TooShort { len: 3 })));
        assert_eq!(d.ack(), None);
        assert_eq!(r.expected_seq(), 0);
        assert_eq!(r.stats().frames_malformed, 1);
    }

    #[test]
    fn simulated_loss_has_no_effect() {
        let mut r = GbnReceiver::new(LossSimulator::scripted([true]));
        let d = r.on_frame_arrived(&data(0, b"gone", false));
        assert_eq!(d, Delivery::Lost);
        assert_eq!(r.expected_seq(), 0);
        assert!(r.assembled().is_empty());

        // Retransmission gets through.
        let d = r.on_frame_arrived(&data(0, b"gone", false));
        assert_eq!(ack_num(&d), Some(0));
        let stats = r.stats();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.frames_lost, 1);
    }

    #[test]
    fn expected_seq_increases_by_one_per_accept() {
        let mut r = GbnReceiver::default();
        let arrivals = [0u16, 1, 1, 3, 2, 2, 3, 0, 4];
        let mut prev = r.expected_seq();
        for seq in arrivals {
            let d = r.on_frame_arrived(&data(seq, &[seq as u8], false));
            let now = r.expected_seq();
            match d {
                Delivery::Accepted { .. } => assert_eq!(now, prev + 1),
                _ => assert_eq!(now, prev),
            }
            prev = now;
        }
        assert_eq!(r.expected_seq(), 5);
        assert_eq!(r.assembled(), &[0, 1, 2, 3, 4]);
    }
}
