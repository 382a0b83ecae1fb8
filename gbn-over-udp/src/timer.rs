//! The single Go-Back-N retransmission timer.
//!
//! One [`RetransmitTimer`] exists per sender.  It is a plain deadline owned by
//! the send loop, which `select!`s on [`RetransmitTimer::expired`] alongside
//! ack receipt, so the timer never runs concurrently with the code that
//! mutates the window.
//!
//! Arming rules (enforced by the caller):
//! - start when a transmission opens an empty window;
//! - stop when an ack empties the window;
//! - restart on any other ack and after every expiry.
//!
//! The timeout therefore bounds the time since the *last* ack, not the age of
//! the oldest unacknowledged segment.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct RetransmitTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    /// A disarmed timer with the given interval.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arm (or re-arm) the timer for one full interval from now.
    pub fn start(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    /// Disarm the timer.
    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves when the armed deadline passes; never resolves while disarmed.
    ///
    /// Does not disarm the timer.  The caller decides whether to restart it.
    pub async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }
}
