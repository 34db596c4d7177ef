use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode, FrameConfig, DELIMITER};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Accumulates stuffed bytes between delimiters and decodes complete frames.
///
/// The accumulator is reset at every delimiter whether or not the frame was
/// valid, so one corrupt frame never affects the next. Back-to-back
/// delimiters are treated as idle fill and produce nothing.
#[derive(Debug)]
pub struct FrameDecoder {
    acc: BytesMut,
    max_frame_size: usize,
    /// Size of the oversized frame currently being skipped.
    overflow: Option<usize>,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            acc: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_frame_size: config.max_frame_size,
            overflow: None,
        }
    }

    /// Feed a single byte; returns the frame result if `byte` ended one.
    pub fn feed(&mut self, byte: u8) -> Option<Result<Bytes>> {
        if byte == DELIMITER {
            self.finish()
        } else {
            self.accumulate(&[byte]);
            None
        }
    }

    /// Feed a chunk of received bytes, handing every completed frame to `sink`.
    ///
    /// Bytes after the last delimiter stay buffered for the next call.
    pub fn push(&mut self, mut chunk: &[u8], mut sink: impl FnMut(Result<Bytes>)) {
        while let Some(at) = chunk.iter().position(|&b| b == DELIMITER) {
            self.accumulate(&chunk[..at]);
            if let Some(result) = self.finish() {
                sink(result);
            }
            chunk = &chunk[at + 1..];
        }
        self.accumulate(chunk);
    }

    /// Number of stuffed bytes waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.overflow.unwrap_or(self.acc.len())
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.acc.clear();
        self.overflow = None;
    }

    fn accumulate(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Some(skipped) = self.overflow.as_mut() {
            *skipped += bytes.len();
            return;
        }
        if self.acc.len() + bytes.len() > self.max_frame_size {
            trace!(max = self.max_frame_size, "frame over limit, skipping to next delimiter");
            self.overflow = Some(self.acc.len() + bytes.len());
            self.acc.clear();
            return;
        }
        self.acc.extend_from_slice(bytes);
    }

    fn finish(&mut self) -> Option<Result<Bytes>> {
        if let Some(size) = self.overflow.take() {
            return Some(Err(FrameError::FrameTooLarge {
                size,
                max: self.max_frame_size,
            }));
        }
        if self.acc.is_empty() {
            return None;
        }

        let mut frame = BytesMut::with_capacity(self.acc.len());
        let result = decode(&self.acc, &mut frame)
            .map(|()| frame.freeze())
            .map_err(FrameError::from);
        self.acc.clear();
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_frame;
    use crate::error::MalformedFrame;

    fn wire(frames: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            encode_frame(frame, &mut buf);
        }
        buf.to_vec()
    }

    fn collect(decoder: &mut FrameDecoder, bytes: &[u8]) -> Vec<Result<Bytes>> {
        let mut out = Vec::new();
        decoder.push(bytes, |r| out.push(r));
        out
    }

    #[test]
    fn decodes_several_frames_from_one_chunk() {
        let mut decoder = FrameDecoder::new();
        let out = collect(&mut decoder, &wire(&[b"one", b"\x00two\x00", b"three"]));

        let frames: Vec<Bytes> = out.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(frames, vec![&b"one"[..], &b"\x00two\x00"[..], &b"three"[..]]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn keeps_partial_frame_across_chunks() {
        let bytes = wire(&[b"split me"]);
        let mut decoder = FrameDecoder::new();

        assert!(collect(&mut decoder, &bytes[..4]).is_empty());
        assert_eq!(decoder.pending(), 4);

        let out = collect(&mut decoder, &bytes[4..]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().as_ref(), b"split me");
    }

    #[test]
    fn empty_payload_decodes_to_empty_frame() {
        let mut decoder = FrameDecoder::new();
        let out = collect(&mut decoder, &[0x01, 0x00]);
        assert_eq!(out.len(), 1);
        assert!(out[0].as_ref().unwrap().is_empty());
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn back_to_back_delimiters_are_idle_fill() {
        let mut decoder = FrameDecoder::new();
        assert!(collect(&mut decoder, &[0x00, 0x00, 0x00]).is_empty());

        let mut bytes = vec![0x00, 0x00];
        bytes.extend(wire(&[b"x"]));
        let out = collect(&mut decoder, &bytes);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn corrupt_frame_does_not_affect_the_next() {
        let mut bytes = wire(&[b"first"]);
        // Truncated run: claims 8 bytes, carries 2.
        bytes.extend_from_slice(&[0x09, 0x11, 0x22, 0x00]);
        bytes.extend(wire(&[b"third"]));

        let mut decoder = FrameDecoder::new();
        let out = collect(&mut decoder, &bytes);

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().as_ref(), b"first");
        assert!(matches!(
            out[1],
            Err(FrameError::Malformed(MalformedFrame::Truncated { .. }))
        ));
        assert_eq!(out[2].as_ref().unwrap().as_ref(), b"third");
    }

    #[test]
    fn resynchronizes_after_joining_mid_frame() {
        let full = wire(&[b"lost frame", b"kept frame"]);
        // Drop the first three bytes, as if we started listening late.
        let mut decoder = FrameDecoder::new();
        let out = collect(&mut decoder, &full[3..]);

        let last = out.last().unwrap().as_ref().unwrap();
        assert_eq!(last.as_ref(), b"kept frame");
    }

    #[test]
    fn oversized_frame_is_skipped_and_reported_once() {
        let config = FrameConfig { max_frame_size: 8 };
        let mut decoder = FrameDecoder::with_config(&config);

        let bytes = wire(&[b"this one is far too long", b"ok"]);
        let out = collect(&mut decoder, &bytes);

        assert_eq!(out.len(), 2);
        assert!(matches!(
            out[0],
            Err(FrameError::FrameTooLarge { size: 25, max: 8 })
        ));
        assert_eq!(out[1].as_ref().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn feed_matches_push() {
        let bytes = wire(&[b"a", b"", b"\x00\x00", b"bcd"]);

        let mut pushed = FrameDecoder::new();
        let expected: Vec<Bytes> = collect(&mut pushed, &bytes)
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let mut fed = FrameDecoder::new();
        let actual: Vec<Bytes> = bytes
            .iter()
            .filter_map(|&b| fed.feed(b))
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(actual, expected);
        assert_eq!(actual.len(), 4);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        collect(&mut decoder, &[0x03, 0x11]);
        decoder.reset();
        assert_eq!(decoder.pending(), 0);

        let out = collect(&mut decoder, &wire(&[b"z"]));
        assert_eq!(out[0].as_ref().unwrap().as_ref(), b"z");
    }
}
