/// Ways the stuffing structure of a received frame can be inconsistent.
///
/// Any of these means the frame was corrupted on the wire. The stream
/// itself stays synchronized: decoding resumes at the next delimiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedFrame {
    /// No bytes between two delimiters; encoding never produces this.
    #[error("empty frame")]
    Empty,

    /// A delimiter byte appeared inside the stuffed data.
    #[error("unexpected delimiter at offset {offset}")]
    UnexpectedDelimiter { offset: usize },

    /// A run-length code points past the end of the frame.
    #[error("run at offset {offset} needs {needed} bytes, only {available} left")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame's stuffing structure is inconsistent.
    #[error("malformed frame: {0}")]
    Malformed(#[from] MalformedFrame),

    /// The frame grew past the configured limit before its delimiter arrived.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error only costs one frame and the stream can continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::FrameTooLarge { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
