/// Errors surfaced by the channel layer.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The name is not one of the channels the protocol declares.
    #[error("no such channel: {0}")]
    UnknownChannel(String),

    /// The protocol declared the same channel name twice.
    #[error("channel {0} declared more than once")]
    DuplicateChannel(String),

    /// The transport loop has stopped; nothing more will be sent.
    #[error("link disconnected")]
    Disconnected,

    /// The codec reported writing more bytes than the buffer it was given.
    #[error("codec wrote {written} bytes into a {capacity}-byte buffer")]
    CodecOverrun { written: usize, capacity: usize },

    /// The transport loop thread panicked.
    #[error("transport loop panicked")]
    WorkerPanicked,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] serialmux_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] serialmux_frame::FrameError),

    /// I/O error outside the stream itself (thread spawn, wake pipe).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
