//! Entry point for `gbn-over-udp`.
//!
//! Parses CLI arguments and dispatches into either **send** or **receive**
//! mode.  All protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, argument parsing), file I/O, and printing the
//! transfer statistics.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use gbn_over_udp::config::{ReceiverConfig, SenderConfig};
use gbn_over_udp::stats::{ReceiverStats, SenderStats};
use gbn_over_udp::transport::UdpTransport;
use gbn_over_udp::{GbnReceiveTransfer, GbnSendTransfer};

/// Post-completion linger: several default sender timeouts.
const DEFAULT_LINGER_MS: u64 = 1_000;

/// Go-Back-N file transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Send a file to a waiting receiver.
    Send {
        /// Receiver address (e.g. 127.0.0.1:12001).
        #[arg(short, long)]
        to: SocketAddr,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:12000")]
        bind: SocketAddr,
        /// File to send.
        #[arg(short, long)]
        file: PathBuf,
        /// Payload bytes per segment; must match the receiver's expectation.
        #[arg(long, default_value_t = 2048)]
        mss: usize,
        /// Go-Back-N window size.
        #[arg(short, long, default_value_t = 4)]
        window: usize,
        /// Retransmission timeout in milliseconds.
        #[arg(long, default_value_t = 100)]
        timeout_ms: u64,
        #[arg(long, default_value_t = 0)]
        stream_id: u16,
    },
    /// Receive one file and write it to disk.
    Receive {
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:12001")]
        bind: SocketAddr,
        /// Where to write the received file.
        #[arg(short, long)]
        out: PathBuf,
        /// Probability in [0, 1) of dropping each inbound data frame.
        #[arg(long, default_value_t = 0.0)]
        loss: f64,
        /// Seed for the loss simulator (reproducible runs).
        #[arg(long)]
        seed: Option<u64>,
        /// Keep re-acking retransmissions this long after completion.
        ///
        /// With 0 the receiver exits at once, and a sender whose final ack was
        /// lost resends its window forever.
        #[arg(long, default_value_t = DEFAULT_LINGER_MS)]
        linger_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Send {
            to,
            bind,
            file,
            mss,
            window,
            timeout_ms,
            stream_id,
        } => {
            let config = SenderConfig::default()
                .with_max_segment_size(mss)?
                .with_window_size(window)?
                .with_timeout(Duration::from_millis(timeout_ms))?
                .with_stream_id(stream_id);
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;

            let transport = UdpTransport::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            log::info!("Sending {} ({} bytes) to {to}", file.display(), data.len());

            let mut sender = GbnSendTransfer::new(transport, to, config)?;
            sender.send(&data).await?;
            report_sender(&sender.stats(), data.len());
        }
        Mode::Receive {
            bind,
            out,
            loss,
            seed,
            linger_ms,
        } => {
            let mut config = ReceiverConfig::default()
                .with_loss_rate(loss)?
                .with_linger(Duration::from_millis(linger_ms));
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }

            let transport = UdpTransport::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            log::info!("Receiving on {bind} (loss rate {loss})");

            let mut receiver = GbnReceiveTransfer::new(transport, config)?;
            let data = receiver.receive().await?;
            tokio::fs::write(&out, &data)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            report_receiver(&receiver.stats());
        }
    }

    Ok(())
}

fn report_sender(stats: &SenderStats, bytes: usize) {
    let secs = stats.elapsed().unwrap_or_default().as_secs_f64();
    log::info!(
        "Sent {bytes} bytes in {secs:.3}s: {} frames ({} retransmitted, {} timeouts), {} acks",
        stats.frames_sent,
        stats.frames_retransmitted,
        stats.timeouts,
        stats.acks_received
    );
}

fn report_receiver(stats: &ReceiverStats) {
    let secs = stats.elapsed().unwrap_or_default().as_secs_f64();
    let rate = stats.throughput().unwrap_or(0.0) / 1024.0;
    log::info!(
        "Received {} bytes in {secs:.3}s ({rate:.1} KiB/s): {} accepted, {} discarded, {} lost, {} malformed, {} acks sent",
        stats.bytes_delivered,
        stats.frames_accepted,
        stats.frames_discarded,
        stats.frames_lost,
        stats.frames_malformed,
        stats.acks_sent
    );
}
