//! A protocol with no structure: every frame is one opaque message.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::queue::BoundedQueue;
use crate::state::{ChannelBinding, ChannelState};

/// Channel holding frames received from the link.
pub const RX: &str = "rx";
/// Channel holding frames waiting to be sent.
pub const TX: &str = "tx";

const DEFAULT_CAPACITY: usize = 16;
const DEFAULT_MAX_FRAME_LEN: usize = 1024;

/// Raw frames in, raw frames out.
///
/// Received frames land on [`RX`]; whatever is queued on [`TX`] is sent one
/// message per frame. When `rx` is full, newly received frames are dropped;
/// empty messages queued on `tx` are dropped too.
#[derive(Debug)]
pub struct Passthrough {
    rx: BoundedQueue<Bytes>,
    tx: BoundedQueue<Bytes>,
    max_frame_len: usize,
    dropped: u64,
}

impl Passthrough {
    pub fn new(rx_capacity: usize, tx_capacity: usize, max_frame_len: usize) -> Self {
        Self {
            rx: BoundedQueue::new(rx_capacity),
            tx: BoundedQueue::new(tx_capacity),
            max_frame_len,
            dropped: 0,
        }
    }

    /// Messages discarded: frames received while `rx` was full, plus `tx`
    /// messages that were empty or too long to send.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl ChannelState for Passthrough {
    type Value = Bytes;

    fn initialize() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_CAPACITY, DEFAULT_MAX_FRAME_LEN)
    }

    fn bindings() -> Vec<ChannelBinding<Self>> {
        vec![
            ChannelBinding::new(
                RX,
                "bytes::Bytes",
                |s, v| s.rx.push(v),
                |s| s.rx.pop(),
                |s| s.rx.len(),
            ),
            ChannelBinding::new(
                TX,
                "bytes::Bytes",
                |s, v| s.tx.push(v),
                |s| s.tx.pop(),
                |s| s.tx.len(),
            ),
        ]
    }

    fn decode(&mut self, frame: &[u8]) {
        if self.rx.push(Bytes::copy_from_slice(frame)).is_err() {
            self.dropped += 1;
            debug!(len = frame.len(), "rx queue full, dropping frame");
        }
    }

    fn encode(&mut self, out: &mut [u8]) -> usize {
        while let Some(frame) = self.tx.pop() {
            // A zero return means "nothing to send", so an empty message
            // has no encoding.
            if frame.is_empty() {
                self.dropped += 1;
                continue;
            }
            if frame.len() > out.len() {
                self.dropped += 1;
                warn!(len = frame.len(), max = out.len(), "outgoing frame too long, dropping");
                continue;
            }
            out[..frame.len()].copy_from_slice(&frame);
            return frame.len();
        }
        0
    }

    fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}
