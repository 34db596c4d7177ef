//! Credit-flow example: a typed protocol where the far end paces telemetry.
//!
//! The device queues readings on `readings`; the host grants credits, one
//! per reading it is ready to take. The device's `put` blocks while its
//! queue is full and no credit has arrived.
//!
//! Run with:
//!   cargo run --example credit-flow

use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use serialmux::channel::{BoundedQueue, ChannelBinding, ChannelState, Client, ClientConfig};

const READINGS: &str = "readings";
const CREDITS: &str = "credits";

const TAG_READING: u8 = b'R';
const TAG_CREDIT: u8 = b'C';

#[derive(Debug, Clone, Copy)]
enum Msg {
    Reading { sensor: u8, millivolts: u16 },
    Credit(u8),
}

/// Both ends run the same protocol; which channels they use differs.
struct Sensors {
    credits: u32,
    readings: BoundedQueue<Msg>,
    outgoing_credits: BoundedQueue<Msg>,
}

impl ChannelState for Sensors {
    type Value = Msg;

    fn initialize() -> Self {
        Self {
            credits: 0,
            readings: BoundedQueue::new(4),
            outgoing_credits: BoundedQueue::new(4),
        }
    }

    fn bindings() -> Vec<ChannelBinding<Self>> {
        vec![
            ChannelBinding::new(
                READINGS,
                "Msg::Reading",
                |s, v| s.readings.push(v),
                |s| s.readings.pop(),
                |s| s.readings.len(),
            ),
            ChannelBinding::new(
                CREDITS,
                "Msg::Credit",
                |s, v| s.outgoing_credits.push(v),
                |s| s.outgoing_credits.pop(),
                |s| s.outgoing_credits.len(),
            ),
        ]
    }

    fn decode(&mut self, frame: &[u8]) {
        match *frame {
            [TAG_READING, sensor, hi, lo] => {
                let millivolts = u16::from_be_bytes([hi, lo]);
                let _ = self.readings.push(Msg::Reading { sensor, millivolts });
            }
            [TAG_CREDIT, n] => self.credits += u32::from(n),
            _ => eprintln!("ignoring unknown frame {frame:02x?}"),
        }
    }

    fn encode(&mut self, out: &mut [u8]) -> usize {
        if let Some(Msg::Credit(n)) = self.outgoing_credits.pop() {
            out[..2].copy_from_slice(&[TAG_CREDIT, n]);
            return 2;
        }
        if self.credits == 0 {
            return 0;
        }
        match self.readings.pop() {
            Some(Msg::Reading { sensor, millivolts }) => {
                self.credits -= 1;
                let [hi, lo] = millivolts.to_be_bytes();
                out[..4].copy_from_slice(&[TAG_READING, sensor, hi, lo]);
                4
            }
            _ => 0,
        }
    }

    fn max_frame_len(&self) -> usize {
        4
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (a, b) = UnixStream::pair()?;
    let host = Client::<Sensors>::start(a, ClientConfig::default())?;
    let device = Client::<Sensors>::start(b, ClientConfig::default())?;

    thread::scope(|s| -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        s.spawn(|| {
            for i in 0..10u16 {
                let reading = Msg::Reading {
                    sensor: (i % 3) as u8,
                    millivolts: 3300 - i * 7,
                };
                if device.put(READINGS, reading).is_err() {
                    return;
                }
            }
        });

        let mut taken = 0;
        while taken < 10 {
            host.put(CREDITS, Msg::Credit(2))?;
            thread::sleep(Duration::from_millis(20));
            while let Some(msg) = host.get(READINGS)? {
                eprintln!("[host] {msg:?}");
                taken += 1;
            }
        }
        Ok(())
    })
    .map_err(|err| err.to_string())?;

    eprintln!("[host] {:?}", host.stats());
    host.shutdown()?;
    device.shutdown()?;
    Ok(())
}
