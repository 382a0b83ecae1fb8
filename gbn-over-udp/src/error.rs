//! Crate-wide error type.

use std::io;

use thiserror::Error;

use crate::frame::FrameError;

#[derive(Error, Debug)]
pub enum GbnError {
    /// Invalid sender / receiver settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input would need more segment indices than the 16-bit space allows.
    #[error("{segments} segments exceed the 16-bit sequence space (max {max})")]
    TooManySegments { segments: usize, max: usize },

    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    /// Socket-level failure; never retried by the protocol engine.
    #[error("socket I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, GbnError>;
