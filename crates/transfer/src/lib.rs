//! Chunked single-file transfer over a request/reply channel.
//!
//! The [`Responder`] owns a source file and answers requests for its name,
//! its chunk count and individual chunks. The [`Requester`] discovers the
//! file, fetches every chunk in order, reconnecting and retrying a chunk
//! under a [`RetryPolicy`], and appends each chunk to the destination once.

mod chunked;
mod progress;
mod requester;
mod responder;
mod retry;
mod types;
mod validation;

pub use chunked::{
    ChunkAppender, SourceFile, bare_file_name, calculate_file_checksum, checksum_bytes, file_size,
};
pub use progress::TransferProgress;
pub use requester::{Requester, RequesterOptions};
pub use responder::{Responder, ResponderOptions};
pub use retry::RetryPolicy;
pub use types::{ReceiveSummary, RequesterState, ServeSummary, ShutdownReason};
pub use validation::validate_file_name;

use ncpy_channel::ChannelError;
use ncpy_protocol::ProtocolError;

/// Status of a completed session.
pub const STATUS_OK: i32 = 0;

/// Status when the channel could not be opened or bound.
pub const STATUS_CHANNEL_FAILED: i32 = -1;

/// Status when the source file is empty, missing or unreadable.
pub const STATUS_SOURCE_FAILED: i32 = -2;

/// Status for every other fatal condition.
pub const STATUS_TRANSFER_FAILED: i32 = -3;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: ChannelError,
    },

    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: ChannelError,
    },

    #[error("source file is empty: {0}")]
    EmptySource(String),

    #[error("source file unavailable: {path}: {source}")]
    SourceUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("chunk {index} out of range (max chunk {max_chunk})")]
    ChunkOutOfRange { index: u32, max_chunk: u32 },

    #[error("chunk {index} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        index: u32,
        attempts: u32,
        last_error: String,
    },
}

impl TransferError {
    /// Negative status reported to whatever invoked the role.
    pub fn status(&self) -> i32 {
        match self {
            TransferError::Connect { .. } | TransferError::Bind { .. } => STATUS_CHANNEL_FAILED,
            TransferError::EmptySource(_) | TransferError::SourceUnavailable { .. } => {
                STATUS_SOURCE_FAILED
            }
            _ => STATUS_TRANSFER_FAILED,
        }
    }
}
