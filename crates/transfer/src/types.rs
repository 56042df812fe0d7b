use std::fmt;
use std::path::PathBuf;

/// Where a requester is in its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequesterState {
    Connecting,
    DiscoveringName,
    DiscoveringChunkCount,
    FetchingChunk(u32),
    Reconnecting { index: u32, attempt: u32 },
    Finishing,
    Done,
}

impl fmt::Display for RequesterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::DiscoveringName => write!(f, "discovering name"),
            Self::DiscoveringChunkCount => write!(f, "discovering chunk count"),
            Self::FetchingChunk(index) => write!(f, "fetching chunk {index}"),
            Self::Reconnecting { index, attempt } => {
                write!(f, "reconnecting for chunk {index} (attempt {attempt})")
            }
            Self::Finishing => write!(f, "finishing"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Outcome of a completed receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveSummary {
    /// Where the file was written.
    pub path: PathBuf,
    /// Name advertised by the responder.
    pub file_name: String,
    /// Number of chunks appended.
    pub chunks: u64,
    pub bytes_written: u64,
    /// Failed exchanges that were retried.
    pub retries: u32,
    /// Hex SHA-256 of the written file.
    pub checksum: String,
}

/// Why a responder stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The requester sent `FINISHED`.
    Finished,
    /// Too many consecutive receive timeouts.
    Idle,
    /// Stopped through the cancellation token.
    Cancelled,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::Idle => write!(f, "idle"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of a responder session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSummary {
    pub reason: ShutdownReason,
    pub file_name: String,
    /// Chunk replies sent, retransmissions included.
    pub chunks_served: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requester_state_display() {
        assert_eq!(RequesterState::FetchingChunk(3).to_string(), "fetching chunk 3");
        assert_eq!(
            RequesterState::Reconnecting {
                index: 2,
                attempt: 1
            }
            .to_string(),
            "reconnecting for chunk 2 (attempt 1)"
        );
    }

    #[test]
    fn shutdown_reason_display() {
        assert_eq!(ShutdownReason::Idle.to_string(), "idle");
        assert_ne!(ShutdownReason::Finished, ShutdownReason::Cancelled);
    }
}
