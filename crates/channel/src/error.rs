//! Error types for the message channel.

/// Errors produced by the request/reply channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("channel closed by peer")]
    Closed,

    #[error("message too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },
}
