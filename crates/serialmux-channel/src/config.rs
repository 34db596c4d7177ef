use serialmux_frame::FrameConfig;

/// Default name of the transport loop thread.
pub const DEFAULT_THREAD_NAME: &str = "serialmux-link";

/// Configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Receive-side framing limits.
    pub frame: FrameConfig,
    /// Name given to the transport loop thread.
    pub thread_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}
