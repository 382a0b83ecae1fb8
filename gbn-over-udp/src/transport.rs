//! Datagram transports.
//!
//! The protocol engine never touches sockets directly; the transfer drivers
//! in [`crate::gbn_transfer`] talk to a [`Transport`]:
//! - [`UdpTransport`]: thin wrapper around `tokio::net::UdpSocket`.
//! - [`MemoryTransport`]: an in-process datagram pipe for tests and
//!   simulations.
//!
//! Transports move raw bytes only; framing lives in [`crate::frame`].

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};

/// Maximum UDP payload size (theoretical limit; in practice kept much smaller).
pub const MAX_DATAGRAM: usize = 65_535;

/// Largest payload a single IPv4 UDP datagram can carry (65 535 minus the
/// 20-byte IP and 8-byte UDP headers).
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// A send-datagram / receive-datagram capability.
///
/// Futures are `Send` so drivers can run on spawned tokio tasks.
pub trait Transport: Send + Sync {
    /// Send `datagram` as a single datagram to `peer`.
    fn send_to(
        &self,
        datagram: &[u8],
        peer: SocketAddr,
    ) -> impl Future<Output = io::Result<()>> + Send;

    /// Wait for the next datagram, copying it into `buf`.
    ///
    /// Returns `(length, source_address)`.  Datagrams longer than `buf` are
    /// truncated.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

// ---------------------------------------------------------------------------
// UDP
// ---------------------------------------------------------------------------

/// An async UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    inner: UdpSocket,
}

impl UdpTransport {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `127.0.0.1:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        Ok(Self { inner })
    }
}

impl Transport for UdpTransport {
    async fn send_to(&self, datagram: &[u8], peer: SocketAddr) -> io::Result<()> {
        self.inner.send_to(datagram, peer).await?;
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

// ---------------------------------------------------------------------------
// In-memory pipe
// ---------------------------------------------------------------------------

type Datagram = (Vec<u8>, SocketAddr);

/// One end of an in-process, lossless, order-preserving datagram pipe.
///
/// Each endpoint has a synthetic loopback address.  Datagrams sent to any
/// address other than the peer's vanish, like UDP to a closed port.
#[derive(Debug)]
pub struct MemoryTransport {
    addr: SocketAddr,
    peer_addr: SocketAddr,
    tx: mpsc::UnboundedSender<Datagram>,
    rx: Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

impl MemoryTransport {
    /// Two connected endpoints at `127.0.0.1:1` and `127.0.0.1:2`.
    pub fn pair() -> (Self, Self) {
        let a_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 1));
        let b_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 2));
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                addr: a_addr,
                peer_addr: b_addr,
                tx: a_tx,
                rx: Mutex::new(a_rx),
            },
            Self {
                addr: b_addr,
                peer_addr: a_addr,
                tx: b_tx,
                rx: Mutex::new(b_rx),
            },
        )
    }
}

impl Transport for MemoryTransport {
    async fn send_to(&self, datagram: &[u8], peer: SocketAddr) -> io::Result<()> {
        if peer != self.peer_addr {
            return Ok(());
        }
        // A closed peer is a lost datagram, not an error.
        let _ = self.tx.send((datagram.to_vec(), self.addr));
        Ok(())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut rx = self.rx.lock().await;
        let (datagram, from) = rx.recv().await.ok_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionAborted, "peer endpoint dropped")
        })?;
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok((n, from))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.addr)
    }
}
