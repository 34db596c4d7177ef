use serde::Serialize;

/// The structured protocol codec that owns every channel queue.
///
/// Implementations are usually generated from a message schema. The
/// transport never looks inside a message: it feeds received frames to
/// [`decode`](Self::decode), asks [`encode`](Self::encode) for outgoing
/// frames, and reaches individual channels only through the bound
/// operations returned by [`bindings`](Self::bindings).
///
/// All calls are made with the client's gate held, one at a time.
pub trait ChannelState: Sized + Send + 'static {
    /// Value carried by the channels. Protocols with several message types
    /// use an enum.
    type Value: Send + 'static;

    /// Fresh state with empty queues at their fixed capacities.
    fn initialize() -> Self;

    /// The channels this protocol carries. Called once per client.
    fn bindings() -> Vec<ChannelBinding<Self>>;

    /// Ingest one received frame.
    ///
    /// Payloads that are structurally valid frames but meaningless to the
    /// protocol are the implementation's to ignore.
    fn decode(&mut self, frame: &[u8]);

    /// Write the next outgoing frame into `out` and return its length.
    ///
    /// Returns `0` when there is nothing to send.
    fn encode(&mut self, out: &mut [u8]) -> usize;

    /// Size of the buffer handed to [`encode`](Self::encode).
    fn max_frame_len(&self) -> usize;
}

/// Identity of a channel: its name and the type of message it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub name: &'static str,
    pub message_type: &'static str,
}

/// Queue operations bound to one channel of a [`ChannelState`].
pub struct ChannelBinding<S: ChannelState> {
    pub(crate) info: ChannelInfo,
    pub(crate) enqueue: fn(&mut S, S::Value) -> Result<(), S::Value>,
    pub(crate) dequeue: fn(&mut S) -> Option<S::Value>,
    pub(crate) depth: fn(&S) -> usize,
}

impl<S: ChannelState> ChannelBinding<S> {
    /// Bind a channel.
    ///
    /// `enqueue` hands the value back when the queue is full; `dequeue`
    /// returns `None` when it is empty; `depth` is the number of queued
    /// messages.
    pub fn new(
        name: &'static str,
        message_type: &'static str,
        enqueue: fn(&mut S, S::Value) -> Result<(), S::Value>,
        dequeue: fn(&mut S) -> Option<S::Value>,
        depth: fn(&S) -> usize,
    ) -> Self {
        Self {
            info: ChannelInfo { name, message_type },
            enqueue,
            dequeue,
            depth,
        }
    }

    /// Name and message type of the bound channel.
    pub fn info(&self) -> &ChannelInfo {
        &self.info
    }
}

impl<S: ChannelState> std::fmt::Debug for ChannelBinding<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("name", &self.info.name)
            .field("message_type", &self.info.message_type)
            .finish()
    }
}
