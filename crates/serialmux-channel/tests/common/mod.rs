//! A small credit-based protocol used to drive a client from a raw peer.
//!
//! Wire format, one message per frame:
//! - `C n`: the peer grants `n` telemetry credits.
//! - `T payload...`: one telemetry sample, sent only against a credit.
//! - `E payload...`: an event pushed by the peer.

#![allow(dead_code)]

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use serialmux_channel::{BoundedQueue, ChannelBinding, ChannelState, Client, ClientConfig};
use serialmux_frame::{encode_frame, FrameReader};

pub const TELEMETRY: &str = "telemetry";
pub const EVENTS: &str = "events";

pub const TELEMETRY_CAPACITY: usize = 2;
const EVENTS_CAPACITY: usize = 8;

pub struct Telemetry {
    pub credits: usize,
    telemetry: BoundedQueue<Bytes>,
    events: BoundedQueue<Bytes>,
}

impl Telemetry {
    pub fn with_credits(credits: usize) -> Self {
        Self {
            credits,
            telemetry: BoundedQueue::new(TELEMETRY_CAPACITY),
            events: BoundedQueue::new(EVENTS_CAPACITY),
        }
    }
}

impl ChannelState for Telemetry {
    type Value = Bytes;

    fn initialize() -> Self {
        Self::with_credits(0)
    }

    fn bindings() -> Vec<ChannelBinding<Self>> {
        vec![
            ChannelBinding::new(
                TELEMETRY,
                "bytes::Bytes",
                |s, v| s.telemetry.push(v),
                |s| s.telemetry.pop(),
                |s| s.telemetry.len(),
            ),
            ChannelBinding::new(
                EVENTS,
                "bytes::Bytes",
                |s, v| s.events.push(v),
                |s| s.events.pop(),
                |s| s.events.len(),
            ),
        ]
    }

    fn decode(&mut self, frame: &[u8]) {
        match frame.split_first() {
            Some((b'C', rest)) => {
                self.credits += rest.first().copied().map_or(0, usize::from);
            }
            Some((b'E', payload)) => {
                let _ = self.events.push(Bytes::copy_from_slice(payload));
            }
            _ => {}
        }
    }

    fn encode(&mut self, out: &mut [u8]) -> usize {
        if self.credits == 0 {
            return 0;
        }
        let Some(sample) = self.telemetry.pop() else {
            return 0;
        };
        self.credits -= 1;
        out[0] = b'T';
        out[1..=sample.len()].copy_from_slice(&sample);
        sample.len() + 1
    }

    fn max_frame_len(&self) -> usize {
        64
    }
}

/// The raw far end of a link, speaking frames by hand.
pub struct Peer {
    reader: FrameReader<UnixStream>,
}

impl Peer {
    pub fn new(stream: UnixStream) -> Self {
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        Self {
            reader: FrameReader::new(stream),
        }
    }

    pub fn send(&mut self, payload: &[u8]) {
        let mut wire = BytesMut::new();
        encode_frame(payload, &mut wire);
        self.send_raw(&wire);
    }

    pub fn send_raw(&mut self, wire: &[u8]) {
        self.reader.get_mut().write_all(wire).unwrap();
    }

    pub fn recv(&mut self) -> Bytes {
        self.reader.read_frame().unwrap()
    }
}

/// A client on one end of a socket pair, with the raw other end.
pub fn telemetry_link(credits: usize) -> (Client<Telemetry>, Peer) {
    let (near, far) = UnixStream::pair().unwrap();
    let client =
        Client::start_with_state(near, Telemetry::with_credits(credits), ClientConfig::default())
            .unwrap();
    (client, Peer::new(far))
}

/// Poll `cond` until it holds, failing the test after five seconds.
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(5));
    }
}
