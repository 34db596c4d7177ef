use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::path::Path;

use bytes::BytesMut;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::tty::SerialPort;

/// A full-duplex byte link the transport loop can drive.
///
/// Writes are blocking. Reads are only ever issued for bytes the kernel
/// already holds, so the loop never stalls inside `read` and its single
/// blocking point stays the readiness wait on [`AsFd`].
pub trait ByteStream: Read + Write + AsFd + Send {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&self) -> io::Result<usize> {
        let mut pending: libc::c_int = 0;
        // SAFETY: the fd is borrowed from a live stream and `pending` is a
        // valid, writable `c_int`, which is what FIONREAD stores into.
        let rc = unsafe { libc::ioctl(self.as_fd().as_raw_fd(), libc::FIONREAD, &mut pending) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(usize::try_from(pending).unwrap_or(0))
    }

    /// Append every currently buffered byte to `buf`.
    ///
    /// Returns the number of bytes appended; `0` means nothing was pending.
    fn read_available(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        let available = self.bytes_available()?;
        if available == 0 {
            return Ok(0);
        }

        let start = buf.len();
        buf.resize(start + available, 0);
        loop {
            match self.read(&mut buf[start..]) {
                Ok(n) => {
                    buf.truncate(start + n);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    buf.truncate(start);
                    return Err(err);
                }
            }
        }
    }
}

impl ByteStream for UnixStream {}
impl ByteStream for TcpStream {}
impl ByteStream for File {}

/// A connected link: a serial device or a socket standing in for one.
///
/// Tools take either without caring which; the socket form is what board
/// simulators and `socat` bridges expose.
pub struct LinkStream {
    inner: LinkStreamInner,
}

enum LinkStreamInner {
    Serial(SerialPort),
    Unix(UnixStream),
}

impl LinkStream {
    /// Open a serial device in raw mode.
    pub fn open_serial(path: impl AsRef<Path>, baud: u32) -> Result<Self> {
        SerialPort::open(path, baud).map(Self::from)
    }

    /// Connect to a Unix domain socket that speaks the serial wire format.
    pub fn connect_unix(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "connected to link socket");
        Ok(Self::from(stream))
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            LinkStreamInner::Serial(port) => Ok(Self::from(port.try_clone()?)),
            LinkStreamInner::Unix(stream) => Ok(Self::from(stream.try_clone()?)),
        }
    }

    /// Block until everything written has left the device.
    ///
    /// Sockets have no output queue of their own to wait on.
    pub fn drain(&self) -> Result<()> {
        match &self.inner {
            LinkStreamInner::Serial(port) => port.drain(),
            LinkStreamInner::Unix(_) => Ok(()),
        }
    }

    /// Short link kind for diagnostics.
    pub fn kind(&self) -> &'static str {
        match &self.inner {
            LinkStreamInner::Serial(_) => "serial",
            LinkStreamInner::Unix(_) => "unix",
        }
    }
}

impl From<SerialPort> for LinkStream {
    fn from(port: SerialPort) -> Self {
        Self {
            inner: LinkStreamInner::Serial(port),
        }
    }
}

impl From<UnixStream> for LinkStream {
    fn from(stream: UnixStream) -> Self {
        Self {
            inner: LinkStreamInner::Unix(stream),
        }
    }
}

impl Read for LinkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.read(buf),
            LinkStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for LinkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.write(buf),
            LinkStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.inner {
            LinkStreamInner::Serial(port) => port.flush(),
            LinkStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl AsFd for LinkStream {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match &self.inner {
            LinkStreamInner::Serial(port) => port.as_fd(),
            LinkStreamInner::Unix(stream) => stream.as_fd(),
        }
    }
}

impl ByteStream for LinkStream {}

impl std::fmt::Debug for LinkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            LinkStreamInner::Serial(port) => f
                .debug_struct("LinkStream")
                .field("type", &"serial")
                .field("path", &port.path())
                .finish(),
            LinkStreamInner::Unix(_) => f.debug_struct("LinkStream").field("type", &"unix").finish(),
        }
    }
}
