use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serialmux_frame::FrameDecoder;
use serialmux_transport::ByteStream;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ChannelError, Result};
use crate::state::{ChannelInfo, ChannelState};
use crate::stats::{LinkStats, LinkStatsSnapshot};
use crate::sync::SyncGate;
use crate::table::{ChannelId, ChannelTable};
use crate::transport::TransportLoop;

/// State shared between the application-facing [`Client`] and its
/// transport loop.
pub(crate) struct Shared<S: ChannelState> {
    pub(crate) gate: SyncGate<S>,
    pub(crate) table: ChannelTable<S>,
    pub(crate) stats: LinkStats,
    stop: AtomicBool,
    closed: AtomicBool,
}

impl<S: ChannelState> Shared<S> {
    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.gate.tx_ready().set();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wakes any producer stalled on a full queue so it can see the close.
    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.gate.tx_done().set();
    }
}

/// Application handle to a multiplexed link.
///
/// Owns the channel state and a background thread running the transport
/// loop. All methods take `&self`; share the client between producer and
/// consumer threads with `Arc` or scoped threads.
pub struct Client<S: ChannelState> {
    shared: Arc<Shared<S>>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl<S: ChannelState> Client<S> {
    /// Start a client over `stream` with freshly initialized state.
    pub fn start<T>(stream: T, config: ClientConfig) -> Result<Self>
    where
        T: ByteStream + 'static,
    {
        Self::start_with_state(stream, S::initialize(), config)
    }

    /// Start a client over `stream` with caller-built state.
    pub fn start_with_state<T>(stream: T, state: S, config: ClientConfig) -> Result<Self>
    where
        T: ByteStream + 'static,
    {
        let table = ChannelTable::new(S::bindings())?;
        table.publish(&state);

        let shared = Arc::new(Shared {
            gate: SyncGate::new(state)?,
            table,
            stats: LinkStats::default(),
            stop: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        let link = TransportLoop::new(
            Arc::clone(&shared),
            stream,
            FrameDecoder::with_config(&config.frame),
        );
        let worker = std::thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || link.run())?;

        debug!(channels = shared.table.infos().count(), "client started");

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Queue `value` on `channel`, blocking while the channel is full.
    ///
    /// A full channel stalls until the transport loop has written at least
    /// one frame, then the enqueue is retried. There is no timeout: if the
    /// link never drains, this never returns. See
    /// [`put_timeout`](Self::put_timeout) for a bounded wait.
    pub fn put(&self, channel: &str, value: S::Value) -> Result<()> {
        let id = self.shared.table.resolve(channel)?;
        // Without a deadline the value is never handed back.
        self.enqueue(id, value, None).map(drop)
    }

    /// Like [`put`](Self::put), giving up after `timeout`.
    ///
    /// Returns `Ok(None)` once queued, or `Ok(Some(value))` with the value
    /// handed back if the channel stayed full for the whole timeout.
    pub fn put_timeout(
        &self,
        channel: &str,
        value: S::Value,
        timeout: Duration,
    ) -> Result<Option<S::Value>> {
        let id = self.shared.table.resolve(channel)?;
        self.enqueue(id, value, Some(Instant::now() + timeout))
    }

    fn enqueue(
        &self,
        id: ChannelId,
        mut value: S::Value,
        deadline: Option<Instant>,
    ) -> Result<Option<S::Value>> {
        let shared = &*self.shared;
        let binding = shared.table.binding(id);
        let tx_done = shared.gate.tx_done();

        let mut state = shared.gate.lock();
        loop {
            // Read before the closed check: `mark_closed` stores the flag
            // and then bumps the generation.
            let seen = tx_done.generation();
            if shared.is_closed() {
                return Err(ChannelError::Disconnected);
            }
            match (binding.enqueue)(&mut state, value) {
                Ok(()) => break,
                Err(rejected) => value = rejected,
            }

            // Every `tx_done.set` that frees space happens under the gate,
            // so none can slip in between the failed enqueue and `seen`.
            drop(state);
            match deadline {
                None => tx_done.wait_past(seen),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() || !tx_done.wait_past_timeout(seen, remaining) {
                        return Ok(Some(value));
                    }
                }
            }
            state = shared.gate.lock();
        }

        shared.table.publish(&state);
        shared.gate.tx_ready().set();
        Ok(None)
    }

    /// Take the oldest message on `channel`, or `None` if it is empty.
    ///
    /// Never blocks on the queue. A successful take raises `tx_ready`,
    /// since freeing space can make the protocol's next outgoing frame
    /// possible, and `tx_done`, so a producer stalled on this channel
    /// retries.
    pub fn get(&self, channel: &str) -> Result<Option<S::Value>> {
        let id = self.shared.table.resolve(channel)?;
        let binding = self.shared.table.binding(id);

        let mut state = self.shared.gate.lock();
        let value = (binding.dequeue)(&mut state);
        if value.is_some() {
            self.shared.table.publish(&state);
            self.shared.gate.tx_ready().set();
            self.shared.gate.tx_done().set();
        }
        Ok(value)
    }

    /// Number of messages queued on `channel`.
    ///
    /// Reads a snapshot without taking the gate, so it may trail a
    /// concurrent `put`, `get` or receive by one operation. Advisory only.
    pub fn avail(&self, channel: &str) -> Result<usize> {
        let id = self.shared.table.resolve(channel)?;
        Ok(self.shared.table.depth(id))
    }

    /// The channels this client carries, in declaration order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.shared.table.infos()
    }

    /// Link counters.
    pub fn stats(&self) -> LinkStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Whether the transport loop is still running.
    pub fn is_connected(&self) -> bool {
        !self.shared.is_closed()
    }

    /// Stop the transport loop and wait for it to exit.
    ///
    /// Returns the loop's exit status: `Ok` for a requested stop, the
    /// failure that ended it otherwise.
    pub fn shutdown(mut self) -> Result<()> {
        self.shared.request_stop();
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| ChannelError::WorkerPanicked)?,
            None => Ok(()),
        }
    }
}

impl<S: ChannelState> Drop for Client<S> {
    fn drop(&mut self) {
        // Not joined: the loop exits on its own once it sees the request.
        self.shared.request_stop();
    }
}

impl<S: ChannelState> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field(
                "channels",
                &self.shared.table.infos().map(|i| i.name).collect::<Vec<_>>(),
            )
            .field("connected", &self.is_connected())
            .finish()
    }
}
