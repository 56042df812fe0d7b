use tokio::sync::mpsc;
use tracing::trace;

/// Progress events emitted by both roles.
///
/// Events are delivered best-effort: a full or closed channel drops them
/// without slowing the transfer down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferProgress {
    /// The file name and chunk count are known.
    Started { file_name: String, total: u64 },
    /// The requester appended chunk `index` (`bytes` long).
    Chunk { index: u32, total: u64, bytes: usize },
    /// The requester is retrying chunk `index` for the `attempt`-th time.
    Retry { index: u32, total: u64, attempt: u32 },
    /// The responder sent chunk `index`.
    Sent { index: u32, total: u64 },
}

/// Sends `event` if a progress channel is attached.
pub(crate) fn report(progress: Option<&mpsc::Sender<TransferProgress>>, event: TransferProgress) {
    if let Some(tx) = progress
        && let Err(e) = tx.try_send(event)
    {
        trace!("progress event dropped: {e}");
    }
}
