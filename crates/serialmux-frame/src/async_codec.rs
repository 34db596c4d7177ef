//! `tokio_util::codec` adapter for the COBS wire format.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode, encode_frame, FrameConfig, DELIMITER};
use crate::error::FrameError;

/// COBS framing for `FramedRead` / `FramedWrite`.
///
/// Corrupt and oversized frames are yielded as `Some(Err(..))` items rather
/// than decoder errors, so one bad frame does not terminate the stream.
/// The decoder's own error type only carries I/O failures.
#[derive(Debug, Clone)]
pub struct CobsCodec {
    max_frame_size: usize,
    /// Bytes of an oversized frame skipped so far.
    skipped: Option<usize>,
}

impl CobsCodec {
    /// Create a codec with the default configuration.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_frame_size: config.max_frame_size,
            skipped: None,
        }
    }
}

impl Default for CobsCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for CobsCodec {
    type Item = Result<Bytes, FrameError>;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let delimiter = src.iter().position(|&b| b == DELIMITER);

            if let Some(skipped) = self.skipped {
                return Ok(match delimiter {
                    Some(at) => {
                        src.advance(at + 1);
                        self.skipped = None;
                        Some(Err(FrameError::FrameTooLarge {
                            size: skipped + at,
                            max: self.max_frame_size,
                        }))
                    }
                    None => {
                        self.skipped = Some(skipped + src.len());
                        src.clear();
                        None
                    }
                });
            }

            match delimiter {
                Some(0) => {
                    src.advance(1);
                }
                Some(at) if at > self.max_frame_size => {
                    src.advance(at + 1);
                    return Ok(Some(Err(FrameError::FrameTooLarge {
                        size: at,
                        max: self.max_frame_size,
                    })));
                }
                Some(at) => {
                    let stuffed = src.split_to(at);
                    src.advance(1);
                    let mut frame = BytesMut::with_capacity(at);
                    let item = decode(&stuffed, &mut frame)
                        .map(|()| frame.freeze())
                        .map_err(FrameError::from);
                    return Ok(Some(item));
                }
                None => {
                    if src.len() > self.max_frame_size {
                        self.skipped = Some(src.len());
                        src.clear();
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                // A frame cut off by EOF never gets its delimiter.
                src.clear();
                self.skipped = None;
                Ok(None)
            }
        }
    }
}

impl Encoder<&[u8]> for CobsCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item, dst);
        Ok(())
    }
}

impl Encoder<Bytes> for CobsCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst);
        Ok(())
    }
}
