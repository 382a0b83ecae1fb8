//! Sender and receiver settings.
//!
//! Both sides must agree on `max_segment_size` out of band; there is no
//! negotiation on the wire.

use std::time::Duration;

use crate::error::{GbnError, Result};
use crate::frame::MIN_DATA_FRAME_LEN;
use crate::transport::MAX_UDP_PAYLOAD;

/// Default segment payload size in bytes.
pub const DEFAULT_MAX_SEGMENT_SIZE: usize = 2048;
/// Largest segment payload whose data frame still fits one UDP datagram.
pub const MAX_SEGMENT_SIZE: usize = MAX_UDP_PAYLOAD - MIN_DATA_FRAME_LEN;
/// Default GBN window size (N).
pub const DEFAULT_WINDOW_SIZE: usize = 4;
/// Default retransmission timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);
/// Default stream identifier.
pub const DEFAULT_STREAM_ID: u16 = 0;

#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Payload bytes per data frame.
    pub max_segment_size: usize,
    /// Maximum number of unacknowledged segments in flight.
    pub window_size: usize,
    /// Retransmission timer interval.
    pub timeout: Duration,
    pub stream_id: u16,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_segment_size: DEFAULT_MAX_SEGMENT_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            timeout: DEFAULT_TIMEOUT,
            stream_id: DEFAULT_STREAM_ID,
        }
    }
}

impl SenderConfig {
    pub fn with_max_segment_size(mut self, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(GbnError::Config(
                "max segment size must be at least 1 byte".into(),
            ));
        }
        if size > MAX_SEGMENT_SIZE {
            return Err(GbnError::Config(format!(
                "max segment size {size} exceeds {MAX_SEGMENT_SIZE}, the largest that fits a UDP datagram"
            )));
        }
        self.max_segment_size = size;
        Ok(self)
    }

    pub fn with_window_size(mut self, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(GbnError::Config("window size must be at least 1".into()));
        }
        self.window_size = window;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(GbnError::Config(
                "retransmission timeout must be non-zero".into(),
            ));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_stream_id(mut self, stream_id: u16) -> Self {
        self.stream_id = stream_id;
        self
    }

    /// Re-check every field; used when the struct was built literally.
    pub fn validate(&self) -> Result<()> {
        self.clone()
            .with_max_segment_size(self.max_segment_size)?
            .with_window_size(self.window_size)?
            .with_timeout(self.timeout)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReceiverConfig {
    /// Probability in `[0, 1)` that an inbound data frame is dropped.
    pub loss_rate: f64,
    /// Seed for the loss simulator; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// How long to keep re-acking duplicates after the final segment.
    pub linger: Duration,
}

impl ReceiverConfig {
    pub fn with_loss_rate(mut self, rate: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(GbnError::Config(format!(
                "loss rate must be in [0, 1), got {rate}"
            )));
        }
        self.loss_rate = rate;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.clone().with_loss_rate(self.loss_rate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tool() {
        let cfg = SenderConfig::default();
        assert_eq!(cfg.max_segment_size, 2048);
        assert_eq!(cfg.window_size, 4);
        assert_eq!(cfg.timeout, Duration::from_millis(100));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_segment_size_rejected() {
        let err = SenderConfig::default().with_max_segment_size(0).unwrap_err();
        assert!(matches!(err, GbnError::Config(_)));
    }

    #[test]
    fn segment_size_capped_by_udp_payload() {
        let cfg = SenderConfig::default()
            .with_max_segment_size(MAX_SEGMENT_SIZE)
            .unwrap();
        assert_eq!(cfg.max_segment_size, 65_501);

        let err = SenderConfig::default()
            .with_max_segment_size(MAX_SEGMENT_SIZE + 1)
            .unwrap_err();
        assert!(matches!(err, GbnError::Config(_)));

        let literal = SenderConfig {
            max_segment_size: 65_535,
            ..Default::default()
        };
        assert!(matches!(literal.validate(), Err(GbnError::Config(_))));
    }

    #[test]
    fn zero_window_rejected() {
        assert!(SenderConfig::default().with_window_size(0).is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(SenderConfig::default().with_timeout(Duration::ZERO).is_err());
    }

    #[test]
    fn literal_config_is_validated() {
        let cfg = SenderConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loss_rate_bounds() {
        assert!(ReceiverConfig::default().with_loss_rate(0.0).is_ok());
        assert!(ReceiverConfig::default().with_loss_rate(0.99).is_ok());
        assert!(ReceiverConfig::default().with_loss_rate(1.0).is_err());
        assert!(ReceiverConfig::default().with_loss_rate(-0.1).is_err());
        assert!(ReceiverConfig::default().with_loss_rate(f64::NAN).is_err());
    }
}
