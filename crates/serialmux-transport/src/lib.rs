//! Byte-stream transport for serialmux.
//!
//! This is the lowest layer of serialmux. It knows nothing about frames or
//! channels; it only moves bytes:
//! - [`ByteStream`]: what the transport loop needs from a link (how much
//!   is buffered, a non-blocking drain, blocking writes, a pollable fd)
//! - [`SerialPort`]: a TTY in raw mode at a fixed baud rate
//! - [`LinkStream`]: either a serial port or a simulator socket
//! - [`wait_readable`]: a multi-source readiness wait over file descriptors
//!
//! Unix only: readiness and buffered-byte queries go through poll(2) and
//! `FIONREAD`.

pub mod error;

#[cfg(unix)]
pub mod poll;
#[cfg(unix)]
pub mod traits;
#[cfg(unix)]
pub mod tty;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use poll::{wait_readable, Readiness};
#[cfg(unix)]
pub use traits::{ByteStream, LinkStream};
#[cfg(unix)]
pub use tty::SerialPort;
