//! Wire-format definitions for data and acknowledgement frames.
//!
//! Every datagram exchanged between the sender and the receiver is either a
//! [`DataFrame`] (sender → receiver) or an [`AckFrame`] (receiver → sender).
//! This module is responsible for:
//! - Defining the on-wire binary layout of both frame kinds.
//! - Serialising frames into byte buffers ready for transmission.
//! - Deserialising raw byte slices back into frames, returning errors for
//!   truncated or otherwise malformed input.
//!
//! No I/O happens here; this is pure data transformation.  There is no
//! checksum: the transport is assumed to deliver datagrams intact or not at
//! all.
//!
//! # Wire format
//!
//! All multi-byte integers are **little-endian**.
//!
//! ```text
//!  Data frame
//! +---------------+---------------+----------------------+---------------+
//! |  seq_num (2)  | stream_id (2) |  payload (0..=mss)   |  trailer (2)  |
//! +---------------+---------------+----------------------+---------------+
//!
//!  Ack frame
//! +---------------+---------------+
//! |  ack_num (2)  | stream_id (2) |
//! +---------------+---------------+
//! ```
//!
//! The trailer is [`TRAILER_MORE`] while more segments follow and
//! [`TRAILER_LAST`] on the final segment of a stream.

use thiserror::Error;

/// Byte length of the data-frame header (`seq_num` + `stream_id`).
pub const HEADER_LEN: usize = 4;

/// Byte length of the data-frame trailer.
pub const TRAILER_LEN: usize = 2;

/// Smallest well-formed data frame: header + trailer, empty payload.
pub const MIN_DATA_FRAME_LEN: usize = HEADER_LEN + TRAILER_LEN;

/// Exact byte length of an ack frame.
pub const ACK_FRAME_LEN: usize = 4;

/// Trailer marker: more segments follow.
pub const TRAILER_MORE: u16 = 0x0000;

/// Trailer marker: final segment of the stream.
pub const TRAILER_LAST: u16 = 0xFFFF;

// Byte offsets within the serialised header.
const OFF_SEQ: usize = 0;
const OFF_STREAM: usize = 2;

/// A single sequenced segment of the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// Segment index within the stream.
    pub seq_num: u16,
    /// Stream identifier (constant per transfer).
    pub stream_id: u16,
    /// Segment bytes.
    pub payload: Vec<u8>,
    /// `true` on the final segment of the stream.
    pub is_last: bool,
}

/// A cumulative acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    /// Highest contiguously received segment index.
    pub ack_num: u16,
    /// Stream identifier echoed from the acknowledged data frame.
    pub stream_id: u16,
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Datagram shorter than header + trailer.
    #[error("data frame of {len} bytes is shorter than the 6-byte minimum")]
    TooShort { len: usize },
    /// Trailer is neither [`TRAILER_MORE`] nor [`TRAILER_LAST`].
    #[error("unknown trailer marker {0:#06x}")]
    InvalidTrailer(u16),
    /// Ack datagram is not exactly [`ACK_FRAME_LEN`] bytes.
    #[error("ack frame must be 4 bytes, got {len}")]
    AckLength { len: usize },
}

/// Serialise a data frame without taking ownership of the payload.
///
/// The result is exactly `HEADER_LEN + payload.len() + TRAILER_LEN` bytes.
pub fn encode_data(seq_num: u16, stream_id: u16, payload: &[u8], is_last: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
    buf.extend_from_slice(&seq_num.to_le_bytes());
    buf.extend_from_slice(&stream_id.to_le_bytes());
    buf.extend_from_slice(payload);
    let trailer = if is_last { TRAILER_LAST } else { TRAILER_MORE };
    buf.extend_from_slice(&trailer.to_le_bytes());
    buf
}

#[inline]
fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

impl DataFrame {
    /// Serialise this frame into a newly allocated byte vector.
    pub fn encode(&self) -> Vec<u8> {
        encode_data(self.seq_num, self.stream_id, &self.payload, self.is_last)
    }

    /// Parse a [`DataFrame`] from a raw byte slice.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`MIN_DATA_FRAME_LEN`], or
    /// - the trailer is not one of the two markers.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < MIN_DATA_FRAME_LEN {
            return Err(FrameError::TooShort { len: buf.len() });
        }

        let trailer_at = buf.len() - TRAILER_LEN;
        let is_last = match read_u16(buf, trailer_at) {
            TRAILER_MORE => false,
            TRAILER_LAST => true,
            other => return Err(FrameError::InvalidTrailer(other)),
        };

        Ok(DataFrame {
            seq_num: read_u16(buf, OFF_SEQ),
            stream_id: read_u16(buf, OFF_STREAM),
            payload: buf[HEADER_LEN..trailer_at].to_vec(),
            is_last,
        })
    }
}

impl AckFrame {
    pub fn new(ack_num: u16, stream_id: u16) -> Self {
        Self { ack_num, stream_id }
    }

    /// Serialise into the fixed 4-byte layout.
    pub fn encode(&self) -> [u8; ACK_FRAME_LEN] {
        let mut buf = [0u8; ACK_FRAME_LEN];
        buf[OFF_SEQ..OFF_SEQ + 2].copy_from_slice(&self.ack_num.to_le_bytes());
        buf[OFF_STREAM..OFF_STREAM + 2].copy_from_slice(&self.stream_id.to_le_bytes());
        buf
    }

    /// Parse an [`AckFrame`]; anything but exactly 4 bytes is rejected.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() != ACK_FRAME_LEN {
            return Err(FrameError::AckLength { len: buf.len() });
        }
        Ok(AckFrame {
            ack_num: read_u16(buf, OFF_SEQ),
            stream_id: read_u16(buf, OFF_STREAM),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(seq_num: u16, payload: &[u8], is_last: bool) -> DataFrame {
        DataFrame {
            seq_num,
            stream_id: 0,
            payload: payload.to_vec(),
            is_last,
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let frame = make_frame(42, b"hello", false);
        let decoded = DataFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn encoded_length_is_header_payload_trailer() {
        let bytes = make_frame(0, b"exactly twelve!", false).encode();
        assert_eq!(bytes.len(), 4 + 15 + 2);
    }

    #[test]
    fn header_fields_little_endian_on_wire() {
        let frame = DataFrame {
            seq_num: 0x0102,
            stream_id: 0x0304,
            payload: vec![0xAA],
            is_last: false,
        };
        let bytes = frame.encode();
        assert_eq!(&bytes[..4], &[0x02, 0x01, 0x04, 0x03]);
        assert_eq!(bytes[4], 0xAA);
    }

    #[test]
    fn trailer_marks_final_segment() {
        let more = make_frame(1, b"ab", false).encode();
        let last = make_frame(1, b"ab", true).encode();
        assert_eq!(&more[more.len() - 2..], &[0x00, 0x00]);
        assert_eq!(&last[last.len() - 2..], &[0xFF, 0xFF]);
        assert!(DataFrame::decode(&last).unwrap().is_last);
        assert!(!DataFrame::decode(&more).unwrap().is_last);
    }

    #[test]
    fn empty_payload_is_minimum_frame() {
        let bytes = make_frame(7, b"", true).encode();
        assert_eq!(bytes.len(), MIN_DATA_FRAME_LEN);
        let decoded = DataFrame::decode(&bytes).unwrap();
        assert!(decoded.payload.is_empty());
        assert_eq!(decoded.seq_num, 7);
    }

    #[test]
    fn decode_short_buffer_returns_error() {
        assert_eq!(DataFrame::decode(&[]), Err(FrameError::TooShort { len: 0 }));
        assert_eq!(
            DataFrame::decode(&[0u8; MIN_DATA_FRAME_LEN - 1]),
            Err(FrameError::TooShort { len: 5 })
        );
    }

    #[test]
    fn decode_unknown_trailer_returns_error() {
        let mut bytes = make_frame(3, b"xyz", false).encode();
        let n = bytes.len();
        bytes[n - 1] = 0x12;
        assert_eq!(
            DataFrame::decode(&bytes),
            Err(FrameError::InvalidTrailer(0x1200))
        );
    }

    #[test]
    fn encode_data_matches_frame_encode() {
        let frame = make_frame(9, b"payload", true);
        assert_eq!(encode_data(9, 0, b"payload", true), frame.encode());
    }

    #[test]
    fn ack_is_four_bytes() {
        let ack = AckFrame::new(0xBEEF, 1);
        let bytes = ack.encode();
        assert_eq!(bytes, [0xEF, 0xBE, 0x01, 0x00]);
        assert_eq!(AckFrame::decode(&bytes), Ok(ack));
    }

    #[test]
    fn ack_wrong_length_rejected() {
        assert_eq!(AckFrame::decode(&[0, 0, 0]), Err(FrameError::AckLength { len: 3 }));
        assert_eq!(
            AckFrame::decode(&[0u8; 6]),
            Err(FrameError::AckLength { len: 6 })
        );
    }
}
