//! Named, bounded, backpressured message channels over one byte stream.
//!
//! A [`Client`] owns a user-supplied [`ChannelState`]: the protocol codec
//! plus one queue per logical channel. A background transport loop moves
//! COBS frames between the stream and that state; application threads
//! exchange typed values with it through [`Client::put`], [`Client::get`]
//! and [`Client::avail`].
//!
//! ```no_run
//! use serialmux_channel::{Client, ClientConfig, Passthrough, RX, TX};
//! use serialmux_transport::LinkStream;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let link = LinkStream::open_serial("/dev/ttyUSB0", 115_200)?;
//! let client = Client::<Passthrough>::start(link, ClientConfig::default())?;
//!
//! client.put(TX, bytes::Bytes::from_static(b"hello"))?;
//! while client.avail(RX)? == 0 {
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! let reply = client.get(RX)?;
//! # let _ = reply;
//! client.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod passthrough;
pub mod queue;
pub mod state;
pub mod stats;

#[cfg(unix)]
mod client;
#[cfg(unix)]
pub mod sync;
#[cfg(unix)]
mod table;
#[cfg(unix)]
mod transport;

#[cfg(unix)]
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_THREAD_NAME};
pub use error::{ChannelError, Result};
pub use passthrough::{Passthrough, RX, TX};
pub use queue::BoundedQueue;
pub use state::{ChannelBinding, ChannelInfo, ChannelState};
pub use stats::LinkStatsSnapshot;
#[cfg(unix)]
pub use sync::{Event, SyncGate, WakeEvent};
