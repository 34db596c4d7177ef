//! COBS-framed, multiplexed message channels over a serial link.
//!
//! One byte stream (a UART, a pty, a Unix socket) carries frames delimited
//! by `0x00`. A user-supplied protocol codec turns those frames into typed
//! messages on named, bounded channels, and a background thread keeps the
//! link moving while application threads `put` and `get`.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial port and socket streams, readiness waiting
//! - [`frame`]: COBS stuffing, the resynchronizing decoder, frame I/O
//! - [`channel`]: the channel state contract, the client and its transport loop

/// Re-export transport types.
pub mod transport {
    pub use serialmux_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialmux_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use serialmux_channel::*;
}
