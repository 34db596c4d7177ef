use bytes::{BufMut, BytesMut};

use crate::error::MalformedFrame;

/// The reserved frame delimiter. Never appears inside stuffed data.
pub const DELIMITER: u8 = 0x00;

/// Default upper bound on a stuffed frame: 64 KiB.
pub const DEFAULT_MAX_FRAME: usize = 64 * 1024;

/// Longest run a single code byte can describe (code `0xFF`).
const MAX_RUN: usize = 254;

/// Worst-case stuffed size of an `len`-byte payload, delimiter excluded.
pub fn max_encoded_len(len: usize) -> usize {
    len + len / MAX_RUN + 1
}

/// Stuff `src` and append the result to `dst`.
///
/// The output contains no [`DELIMITER`] byte. Callers mark the end of the
/// frame by appending exactly one delimiter (see [`encode_frame`]).
///
/// Each block is a code byte `n` followed by `n - 1` non-zero bytes; the
/// block implies a trailing zero unless `n` is `0xFF` or it is the last
/// block:
/// ```text
/// [11 22 00 33]  ->  03 11 22 02 33
/// []             ->  01
/// [00]           ->  01 01
/// ```
pub fn encode(src: &[u8], dst: &mut BytesMut) {
    dst.reserve(max_encoded_len(src.len()));

    let mut code_at = dst.len();
    dst.put_u8(0);
    let mut code: u8 = 1;

    for (i, &byte) in src.iter().enumerate() {
        if byte == DELIMITER {
            dst[code_at] = code;
            code_at = dst.len();
            dst.put_u8(0);
            code = 1;
            continue;
        }

        dst.put_u8(byte);
        code += 1;
        if usize::from(code) == MAX_RUN + 1 && i + 1 < src.len() {
            dst[code_at] = code;
            code_at = dst.len();
            dst.put_u8(0);
            code = 1;
        }
    }

    dst[code_at] = code;
}

/// Stuff `src` and append it to `dst` followed by the delimiter.
pub fn encode_frame(src: &[u8], dst: &mut BytesMut) {
    encode(src, dst);
    dst.put_u8(DELIMITER);
}

/// Unstuff `src` (delimiter already stripped) and append the payload to `dst`.
///
/// On error nothing is appended.
pub fn decode(src: &[u8], dst: &mut BytesMut) -> Result<(), MalformedFrame> {
    if src.is_empty() {
        return Err(MalformedFrame::Empty);
    }

    let start = dst.len();
    dst.reserve(src.len());

    let mut pos = 0usize;
    while pos < src.len() {
        let code = src[pos];
        if code == DELIMITER {
            dst.truncate(start);
            return Err(MalformedFrame::UnexpectedDelimiter { offset: pos });
        }

        let end = pos + usize::from(code);
        if end > src.len() {
            dst.truncate(start);
            return Err(MalformedFrame::Truncated {
                offset: pos,
                needed: usize::from(code) - 1,
                available: src.len() - pos - 1,
            });
        }

        let run = &src[pos + 1..end];
        if let Some(i) = run.iter().position(|&b| b == DELIMITER) {
            dst.truncate(start);
            return Err(MalformedFrame::UnexpectedDelimiter {
                offset: pos + 1 + i,
            });
        }

        dst.put_slice(run);
        pos = end;
        if usize::from(code) <= MAX_RUN && pos < src.len() {
            dst.put_u8(0);
        }
    }

    Ok(())
}

/// Configuration for frame decoding.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest stuffed frame accepted before its delimiter. Default: 64 KiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}
