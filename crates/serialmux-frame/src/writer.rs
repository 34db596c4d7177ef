use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, max_encoded_len};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Stuff `frame`, terminate it, and write it to `w` in full, then flush.
///
/// `scratch` is cleared and reused as the encode buffer.
pub fn write_frame<W: Write + ?Sized>(
    w: &mut W,
    frame: &[u8],
    scratch: &mut BytesMut,
) -> Result<usize> {
    scratch.clear();
    scratch.reserve(max_encoded_len(frame.len()) + 1);
    encode_frame(frame, scratch);

    let mut offset = 0usize;
    while offset < scratch.len() {
        match w.write(&scratch[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }

    flush(w)?;
    Ok(scratch.len())
}

fn flush<W: Write + ?Sized>(w: &mut W) -> Result<()> {
    loop {
        match w.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
}

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and send one frame (blocking). Returns the bytes put on the wire.
    pub fn send(&mut self, frame: &[u8]) -> Result<usize> {
        write_frame(&mut self.inner, frame, &mut self.buf)
    }

    /// Send a bare delimiter.
    ///
    /// A peer that joined mid-frame discards its partial buffer on it.
    pub fn send_break(&mut self) -> Result<()> {
        loop {
            match self.inner.write(&[crate::codec::DELIMITER]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(_) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        flush(&mut self.inner)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
