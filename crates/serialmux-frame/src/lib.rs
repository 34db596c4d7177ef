//! COBS byte-stuffed framing for serial links.
//!
//! Every frame on the wire is the Consistent Overhead Byte Stuffing (COBS)
//! encoding of its payload followed by a single `0x00` delimiter:
//! - the stuffed bytes never contain `0x00`, so the delimiter is unambiguous
//! - a reader that joins mid-stream, or loses bytes to line noise, recovers
//!   at the next delimiter
//! - overhead is one byte per 254 payload bytes, plus one
//!
//! There is no length prefix, header or checksum at this layer; whatever
//! integrity the application needs lives inside the payload.

pub mod codec;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode, encode, encode_frame, max_encoded_len, FrameConfig, DEFAULT_MAX_FRAME, DELIMITER,
};
pub use decoder::FrameDecoder;
pub use error::{FrameError, MalformedFrame, Result};
pub use reader::FrameReader;
pub use writer::{write_frame, FrameWriter};

#[cfg(feature = "async")]
pub use async_codec::CobsCodec;
