//! Loopback example: two passthrough clients on either end of a socket pair.
//!
//! Run with:
//!   cargo run --example loopback

use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use serialmux::channel::{Client, ClientConfig, Passthrough, RX, TX};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (a, b) = UnixStream::pair()?;
    let host = Client::<Passthrough>::start(a, ClientConfig::default())?;
    let device = Client::<Passthrough>::start(b, ClientConfig::default())?;

    for msg in ["ping", "with\0zero", ""] {
        host.put(TX, Bytes::from(msg))?;
    }

    // The empty message has no encoding, so only two arrive.
    while device.avail(RX)? < 2 {
        thread::sleep(Duration::from_millis(5));
    }
    while let Some(frame) = device.get(RX)? {
        eprintln!("[device] {:?}", frame);
    }

    eprintln!("[host] {:?}", host.stats());
    eprintln!("[device] {:?}", device.stats());

    host.shutdown()?;
    device.shutdown()?;
    Ok(())
}
