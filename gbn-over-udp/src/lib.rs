//! `gbn-over-udp`, reliable, ordered whole-file delivery over UDP using
//! Go-Back-N ARQ.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────┐   DATA frames   ┌────────────────────┐
//!  │ GbnSendTransfer  │────────────────▶│ GbnReceiveTransfer │
//!  │  GbnSender       │                 │  LossSimulator     │
//!  │  RetransmitTimer │◀────────────────│  GbnReceiver       │
//!  └────────┬─────────┘   cumulative    └─────────┬──────────┘
//!           │             ACKs                    │
//!  ┌────────▼─────────────────────────────────────▼──────────┐
//!  │           Transport (UDP socket / in-memory pipe)       │
//!  └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`frame`]        : wire format (serialise / deserialise)
//! - [`gbn_sender`]   : GBN outbound window state machine + segmentation
//! - [`gbn_receiver`] : GBN inbound cumulative-ACK state machine
//! - [`gbn_transfer`] : async drivers wiring state machines to a transport
//! - [`timer`]        : the single retransmission timer
//! - [`simulator`]    : receiver-side loss simulation
//! - [`transport`]    : datagram transport abstraction
//! - [`stats`]        : per-transfer counters
//! - [`config`]       : sender / receiver settings
//! - [`error`]        : crate error type

pub mod config;
pub mod error;
pub mod frame;
pub mod gbn_receiver;
pub mod gbn_sender;
pub mod gbn_transfer;
pub mod simulator;
pub mod stats;
pub mod timer;
pub mod transport;

pub use error::{GbnError, Result};
pub use gbn_transfer::{GbnReceiveTransfer, GbnSendTransfer};
