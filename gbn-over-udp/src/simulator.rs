//! Loss simulation for exercising the retransmission path.
//!
//! Real networks drop packets; loopback almost never does.  To exercise the
//! Go-Back-N timeout / retransmit machinery without depending on actual
//! network conditions, the receiver passes every inbound data frame through a
//! [`LossSimulator`] before its state machine sees it.  A dropped frame has no
//! observable effect (no ack), exactly like a frame lost on the wire.
//!
//! [`LossyTransport`] applies the same model to any [`Transport`]'s inbound
//! datagrams, which is how ack loss is simulated at the sender.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::transport::Transport;

#[derive(Debug)]
enum DropModel {
    /// Never drop.
    Disabled,
    /// Independent Bernoulli trial per frame.
    Random { rate: f64, rng: StdRng },
    /// Replay fixed decisions, then pass everything.
    Scripted(VecDeque<bool>),
}

/// Decides, per inbound frame, whether to discard it.
#[derive(Debug)]
pub struct LossSimulator {
    model: DropModel,
}

impl Default for LossSimulator {
    fn default() -> Self {
        Self::disabled()
    }
}

impl LossSimulator {
    /// Pass-through simulator.
    pub fn disabled() -> Self {
        Self {
            model: DropModel::Disabled,
        }
    }

    /// Drop with probability `rate`, seeded from the OS entropy source.
    ///
    /// # Panics
    ///
    /// Panics if `rate` is outside `[0, 1)`.
    pub fn new(rate: f64) -> Self {
        Self::with_rng(rate, StdRng::from_rng(&mut rand::rng()))
    }

    /// Drop with probability `rate` using a reproducible seed.
    pub fn seeded(rate: f64, seed: u64) -> Self {
        Self::with_rng(rate, StdRng::seed_from_u64(seed))
    }

    /// Replay `decisions` (`true` = drop) for the first frames, then never drop.
    pub fn scripted(decisions: impl IntoIterator<Item = bool>) -> Self {
        Self {
            model: DropModel::Scripted(decisions.into_iter().collect()),
        }
    }

    fn with_rng(rate: f64, rng: StdRng) -> Self {
        assert!(
            (0.0..1.0).contains(&rate),
            "loss rate must be in [0, 1), got {rate}"
        );
        if rate == 0.0 {
            return Self::disabled();
        }
        Self {
            model: DropModel::Random { rate, rng },
        }
    }

    /// Configured drop probability; `0.0` for disabled and scripted models.
    pub fn loss_rate(&self) -> f64 {
        match &self.model {
            DropModel::Random { rate, .. } => *rate,
            _ => 0.0,
        }
    }

    /// Decide the fate of the next inbound frame.
    pub fn should_drop(&mut self) -> bool {
        match &mut self.model {
            DropModel::Disabled => false,
            DropModel::Random { rate, rng } => rng.random_bool(*rate),
            DropModel::Scripted(decisions) => decisions.pop_front().unwrap_or(false),
        }
    }
}

/// A [`Transport`] wrapper that discards inbound datagrams according to a
/// [`LossSimulator`].
///
/// Outbound datagrams pass through untouched.  Dropped inbound datagrams are
/// swallowed and the wrapper keeps waiting for the next one.
#[derive(Debug)]
pub struct LossyTransport<T> {
    inner: T,
    simulator: Mutex<LossSimulator>,
}

impl<T> LossyTransport<T> {
    pub fn new(inner: T, simulator: LossSimulator) -> Self {
        Self {
            inner,
            simulator: Mutex::new(simulator),
        }
    }

    fn should_drop(&self) -> bool {
        match self.simulator.lock() {
            Ok(mut sim) => sim.should_drop(),
            Err(poisoned) => poisoned.into_inner().should_drop(),
        }
    }
}

impl<T: Transport> Transport for LossyTransport<T> {
    fn send_to(
        &self,
        datagram: &[u8],
        peer: SocketAddr,
    ) -> impl Future<Output = io::Result<()>> + Send {
        self.inner.send_to(datagram, peer)
    }

    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send {
        async move {
            loop {
                let (n, from) = self.inner.recv_from(buf).await?;
                if self.should_drop() {
                    log::debug!("[sim] dropped inbound datagram ({n} bytes) from {from}");
                    continue;
                }
                return Ok((n, from));
            }
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_never_drops() {
        let mut sim = LossSimulator::disabled();
        assert!((0..1000).all(|_| !sim.should_drop()));
    }

    #[test]
    fn zero_rate_is_disabled() {
        let mut sim = LossSimulator::new(0.0);
        assert_eq!(sim.loss_rate(), 0.0);
        assert!((0..1000).all(|_| !sim.should_drop()));
    }

    #[test]
    fn seeded_is_reproducible() {
        let mut a = LossSimulator::seeded(0.3, 7);
        let mut b = LossSimulator::seeded(0.3, 7);
        let da: Vec<bool> = (0..200).map(|_| a.should_drop()).collect();
        let db: Vec<bool> = (0..200).map(|_| b.should_drop()).collect();
        assert_eq!(da, db);
    }

    #[test]
    fn seeded_rate_is_roughly_honoured() {
        let mut sim = LossSimulator::seeded(0.25, 1234);
        let drops = (0..10_000).filter(|_| sim.should_drop()).count();
        assert!((2000..3000).contains(&drops), "drops = {drops}");
    }

    #[test]
    fn scripted_replays_then_passes() {
        let mut sim = LossSimulator::scripted([true, false, true]);
        assert!(sim.should_drop());
        assert!(!sim.should_drop());
        assert!(sim.should_drop());
        assert!(!sim.should_drop());
        assert!(!sim.should_drop());
    }

    #[test]
    #[should_panic]
    fn rate_of_one_rejected() {
        let _ = LossSimulator::seeded(1.0, 0);
    }
}
