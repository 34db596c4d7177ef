use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Link counters, updated by the transport loop.
#[derive(Debug, Default)]
pub struct LinkStats {
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    malformed_frames: AtomicU64,
    oversized_frames: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatsSnapshot {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub frames_sent: u64,
    /// Frames dropped because their stuffing was inconsistent.
    pub malformed_frames: u64,
    /// Frames dropped because they outgrew the receive limit.
    pub oversized_frames: u64,
}

impl LinkStats {
    pub(crate) fn record_bytes_received(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_frame_sent(&self, wire_len: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(wire_len as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_oversized(&self) {
        self.oversized_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            oversized_frames: self.oversized_frames.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let stats = LinkStats::default();
        stats.record_bytes_received(10);
        stats.record_frame_received();
        stats.record_frame_sent(7);
        stats.record_frame_sent(3);
        stats.record_malformed();
        stats.record_oversized();

        assert_eq!(
            stats.snapshot(),
            LinkStatsSnapshot {
                bytes_received: 10,
                bytes_sent: 10,
                frames_received: 1,
                frames_sent: 2,
                malformed_frames: 1,
                oversized_frames: 1,
            }
        );
    }
}
