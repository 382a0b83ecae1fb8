//! Per-transfer counters.
//!
//! Each sender / receiver owns its stats value and is the only writer.
//! Callers read a `Copy` snapshot through `stats()`; formatting and printing
//! are left to the reporter (the binary).

use std::time::{Duration, Instant};

/// Send-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Data frames handed to the transport, retransmissions included.
    pub frames_sent: u64,
    /// Subset of `frames_sent` caused by timer expiry.
    pub frames_retransmitted: u64,
    /// Number of retransmission timer expiries.
    pub timeouts: u64,
    /// Well-formed acks from the peer for this stream.
    pub acks_received: u64,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

/// Receive-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Datagrams that arrived, before loss simulation.
    pub frames_received: u64,
    /// Datagrams discarded by the loss simulator.
    pub frames_lost: u64,
    /// Datagrams that failed to decode.
    pub frames_malformed: u64,
    /// In-order frames appended to the stream.
    pub frames_accepted: u64,
    /// Out-of-order or duplicate frames thrown away.
    pub frames_discarded: u64,
    pub acks_sent: u64,
    /// Payload bytes appended to the stream.
    pub bytes_delivered: u64,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

fn elapsed(started: Option<Instant>, finished: Option<Instant>) -> Option<Duration> {
    match (started, finished) {
        (Some(s), Some(f)) => Some(f.saturating_duration_since(s)),
        (Some(s), None) => Some(s.elapsed()),
        _ => None,
    }
}

impl SenderStats {
    /// Transfer duration so far (or total, once finished).
    pub fn elapsed(&self) -> Option<Duration> {
        elapsed(self.started_at, self.finished_at)
    }
}

impl ReceiverStats {
    pub fn elapsed(&self) -> Option<Duration> {
        elapsed(self.started_at, self.finished_at)
    }

    /// Delivered payload bytes per second, once the transfer has finished.
    pub fn throughput(&self) -> Option<f64> {
        let finished = self.finished_at?;
        let secs = elapsed(self.started_at, Some(finished))?.as_secs_f64();
        (secs > 0.0).then(|| self.bytes_delivered as f64 / secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_none_before_start() {
        assert_eq!(SenderStats::default().elapsed(), None);
        assert_eq!(ReceiverStats::default().throughput(), None);
    }

    #[test]
    fn elapsed_uses_finish_instant() {
        let start = Instant::now();
        let stats = SenderStats {
            started_at: Some(start),
            finished_at: Some(start + Duration::from_millis(250)),
            ..Default::default()
        };
        assert_eq!(stats.elapsed(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn throughput_in_bytes_per_second() {
        let start = Instant::now();
        let stats = ReceiverStats {
            bytes_delivered: 1000,
            started_at: Some(start),
            finished_at: Some(start + Duration::from_secs(2)),
            ..Default::default()
        };
        assert_eq!(stats.throughput(), Some(500.0));
    }
}
