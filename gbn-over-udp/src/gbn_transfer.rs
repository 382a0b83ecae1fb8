//! Go-Back-N transfer drivers: state machines + transport + timer.
//!
//! # Architecture
//!
//! ```text
//!  GbnSendTransfer                          GbnReceiveTransfer
//!    ├── GbnSender (window)                   └── GbnReceiver (reassembly,
//!    ├── RetransmitTimer                            loss simulator)
//!    └── T: Transport ──── DATA ────────────▶ T: Transport
//!                     ◀─── ACK ─────────────
//! ```
//!
//! Each driver runs on one task.  The send loop multiplexes ack receipt and
//! timer expiry with `tokio::select!`, so the window is only ever touched by
//! that task and a full window never blocks past a timeout.
//!
//! ```ignore
//! let transport = UdpTransport::bind("0.0.0.0:12000".parse()?).await?;
//! let mut tx = GbnSendTransfer::new(transport, peer, SenderConfig::default())?;
//! tx.send(&bytes).await?;
//! println!("{:?}", tx.stats());
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use crate::config::{ReceiverConfig, SenderConfig};
use crate::error::Result;
use crate::frame::{AckFrame, ACK_FRAME_LEN};
use crate::gbn_receiver::{Delivery, GbnReceiver};
use crate::gbn_sender::{split_segments, AckOutcome, GbnSender};
use crate::simulator::LossSimulator;
use crate::stats::{ReceiverStats, SenderStats};
use crate::timer::RetransmitTimer;
use crate::transport::{Transport, MAX_DATAGRAM};

/// Larger than any valid ack so oversized datagrams are detected, not
/// silently truncated into something that decodes.
const ACK_BUF_LEN: usize = ACK_FRAME_LEN + 1;

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Sends whole byte streams to one fixed peer.
pub struct GbnSendTransfer<T> {
    transport: T,
    peer: SocketAddr,
    config: SenderConfig,
    /// Window state; `None` outside of a transfer.
    window: Option<GbnSender>,
    timer: RetransmitTimer,
    stats: SenderStats,
}

enum SendEvent {
    Datagram(std::io::Result<(usize, SocketAddr)>),
    Timeout,
}

impl<T: Transport> GbnSendTransfer<T> {
    pub fn new(transport: T, peer: SocketAddr, config: SenderConfig) -> Result<Self> {
        config.validate()?;
        let timer = RetransmitTimer::new(config.timeout);
        Ok(Self {
            transport,
            peer,
            config,
            window: None,
            timer,
            stats: SenderStats::default(),
        })
    }

    /// Snapshot of the counters for the most recent transfer.
    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    /// Window state while a transfer is running.
    pub fn window(&self) -> Option<&GbnSender> {
        self.window.as_ref()
    }

    /// Split `data` into segments and deliver them.
    ///
    /// Returns once every segment has been cumulatively acknowledged.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let segments = split_segments(data, self.config.max_segment_size)?;
        self.send_segments(segments).await
    }

    /// Deliver pre-split segments in order.
    ///
    /// Fails before the first transmission if the segment count does not fit
    /// the 16-bit sequence space.  Socket errors abort the transfer.  There is
    /// no retry cap: timeouts retransmit the window until the peer catches up.
    pub async fn send_segments(&mut self, segments: Vec<Vec<u8>>) -> Result<()> {
        let sender = GbnSender::new(segments, self.config.window_size, self.config.stream_id)?;
        log::info!(
            "[gbn] sending {} segment(s) to {} (window={}, timeout={:?})",
            sender.segment_count(),
            self.peer,
            sender.window_size(),
            self.timer.timeout()
        );

        self.stats = SenderStats {
            started_at: Some(Instant::now()),
            ..Default::default()
        };
        self.window = Some(sender);
        let result = self.run().await;
        self.timer.stop();
        self.window = None;
        self.stats.finished_at = Some(Instant::now());

        if result.is_ok() {
            log::info!(
                "[gbn] transfer to {} complete: {} frame(s) sent, {} retransmitted",
                self.peer,
                self.stats.frames_sent,
                self.stats.frames_retransmitted
            );
        }
        result
    }

    async fn run(&mut self) -> Result<()> {
        let mut buf = [0u8; ACK_BUF_LEN];

        loop {
            let Some(sender) = self.window.as_mut() else {
                return Ok(());
            };
            if sender.is_complete() {
                return Ok(());
            }

            if let Some(tx) = sender.next_transmission() {
                self.transport.send_to(&tx.frame, self.peer).await?;
                self.stats.frames_sent += 1;
                if tx.opens_window {
                    self.timer.start();
                }
                log::debug!(
                    "[gbn] → DATA seq={} in_flight={}",
                    tx.seq_num,
                    sender.in_flight()
                );
                continue;
            }

            // Window full (or everything sent): wait for an ack or the timer.
            let event = tokio::select! {
                res = self.transport.recv_from(&mut buf) => SendEvent::Datagram(res),
                _ = self.timer.expired() => SendEvent::Timeout,
            };

            match event {
                SendEvent::Datagram(res) => {
                    let (n, from) = res?;
                    self.on_datagram(&buf[..n], from);
                }
                SendEvent::Timeout => self.retransmit_window().await?,
            }
        }
    }

    /// Feed one inbound datagram to the window and adjust the timer.
    fn on_datagram(&mut self, raw: &[u8], from: SocketAddr) {
        if from != self.peer {
            log::debug!("[gbn] ignoring datagram from unexpected source {from}");
            return;
        }
        let ack = match AckFrame::decode(raw) {
            Ok(ack) => ack,
            Err(e) => {
                log::warn!("[gbn] dropping malformed ack from {from}: {e}");
                return;
            }
        };
        let Some(sender) = self.window.as_mut() else {
            return;
        };
        if ack.stream_id != sender.stream_id() {
            log::debug!("[gbn] ignoring ack for stream {}", ack.stream_id);
            return;
        }

        self.stats.acks_received += 1;
        match sender.on_ack(ack.ack_num) {
            AckOutcome::Invalid => {
                log::warn!(
                    "[gbn] ← ACK {} for unsent segment (next_seq={})",
                    ack.ack_num,
                    sender.next_seq()
                );
                return;
            }
            AckOutcome::Stale => {
                log::debug!("[gbn] ← ACK {} (duplicate, base={})", ack.ack_num, sender.base());
            }
            AckOutcome::Advanced { newly_acked } => {
                log::debug!(
                    "[gbn] ← ACK {} slid={} base={}",
                    ack.ack_num,
                    newly_acked,
                    sender.base()
                );
            }
        }

        if sender.window_is_empty() {
            self.timer.stop();
        } else {
            self.timer.start();
        }
    }

    /// Go-Back-N step: resend `[base, next_seq)` in order and restart the timer.
    async fn retransmit_window(&mut self) -> Result<()> {
        let Some(sender) = self.window.as_ref() else {
            return Ok(());
        };
        self.stats.timeouts += 1;
        log::debug!(
            "[gbn] timeout, retransmitting {} segment(s) from base={}",
            sender.in_flight(),
            sender.base()
        );
        for frame in sender.window_frames() {
            self.transport.send_to(&frame, self.peer).await?;
            self.stats.frames_sent += 1;
            self.stats.frames_retransmitted += 1;
        }
        self.timer.start();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// Receives one byte stream per [`receive`](Self::receive) call.
pub struct GbnReceiveTransfer<T> {
    transport: T,
    config: ReceiverConfig,
    stats: ReceiverStats,
}

impl<T: Transport> GbnReceiveTransfer<T> {
    pub fn new(transport: T, config: ReceiverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            stats: ReceiverStats::default(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Snapshot of the counters for the most recent transfer.
    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    fn simulator(&self) -> LossSimulator {
        match (self.config.loss_rate, self.config.seed) {
            (rate, _) if rate == 0.0 => LossSimulator::disabled(),
            (rate, Some(seed)) => LossSimulator::seeded(rate, seed),
            (rate, None) => LossSimulator::new(rate),
        }
    }

    /// Block until a complete stream has arrived and return its bytes.
    ///
    /// Acks go to the source address of each data frame.  Socket errors are
    /// propagated; malformed and loss-simulated frames are not errors.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        let mut receiver = GbnReceiver::new(self.simulator());
        let mut buf = vec![0u8; MAX_DATAGRAM];

        let data = loop {
            let (n, from) = self.transport.recv_from(&mut buf).await?;
            let delivery = receiver.on_frame_arrived(&buf[..n]);
            self.stats = receiver.stats();
            if let Some(ack) = delivery.ack() {
                self.transport.send_to(&ack.encode(), from).await?;
            }
            if let Delivery::Accepted {
                completed: Some(data),
                ..
            } = delivery
            {
                break data;
            }
        };

        if !self.config.linger.is_zero() {
            if let Err(e) = self.linger(&mut receiver, &mut buf).await {
                // The stream is already complete; a dead socket only ends the linger.
                log::debug!("[gbn] linger ended early: {e}");
            }
        }
        Ok(data)
    }

    /// Keep answering retransmissions with the final ack for a while, so a
    /// sender whose last ack was lost can still finish.
    async fn linger(&mut self, receiver: &mut GbnReceiver, buf: &mut [u8]) -> Result<()> {
        let deadline = tokio::time::Instant::now() + self.config.linger;
        loop {
            let res = tokio::time::timeout_at(deadline, self.transport.recv_from(buf)).await;
            let Ok(res) = res else {
                return Ok(());
            };
            let (n, from) = res?;
            let delivery = receiver.on_frame_arrived(&buf[..n]);
            self.stats = receiver.stats();
            if let Some(ack) = delivery.ack() {
                self.transport.send_to(&ack.encode(), from).await?;
            }
        }
    }
}
