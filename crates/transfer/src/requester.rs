//! Client role: discovers the remote file and fetches it chunk by chunk.

use std::path::PathBuf;

use ncpy_channel::{ChannelError, Connector, RequestChannel};
use ncpy_protocol::Request;
use ncpy_protocol::messages::{decode_chunk_reply, decode_filename_reply, decode_max_chunk_reply};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::TransferError;
use crate::chunked::{ChunkAppender, calculate_file_checksum};
use crate::progress::{TransferProgress, report};
use crate::retry::RetryPolicy;
use crate::types::{ReceiveSummary, RequesterState};
use crate::validation::validate_file_name;

/// Where and how the requester writes the received file.
#[derive(Debug, Clone)]
pub struct RequesterOptions {
    /// Directory the advertised file name is joined onto.
    pub output_dir: PathBuf,
    /// Explicit destination; overrides `output_dir`.
    pub output_path: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Default for RequesterOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_path: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl RequesterOptions {
    fn destination(&self, file_name: &str) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(file_name))
    }
}

/// Fetches one file from a responder.
pub struct Requester<C: Connector> {
    connector: C,
    options: RequesterOptions,
    progress: Option<mpsc::Sender<TransferProgress>>,
    state: RequesterState,
}

impl<C: Connector> Requester<C> {
    pub fn new(connector: C, options: RequesterOptions) -> Self {
        Self {
            connector,
            options,
            progress: None,
            state: RequesterState::Connecting,
        }
    }

    /// Attaches a channel that receives progress events.
    pub fn with_progress(mut self, tx: mpsc::Sender<TransferProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn state(&self) -> RequesterState {
        self.state
    }

    /// Runs a full session: discovery, every chunk, then `FINISHED`.
    ///
    /// The channel is closed on every exit path.
    pub async fn run(&mut self) -> Result<ReceiveSummary, TransferError> {
        self.transition(RequesterState::Connecting);
        let peer = self.connector.peer();
        let channel = self
            .connector
            .connect()
            .await
            .map_err(|source| TransferError::Connect {
                addr: peer.clone(),
                source,
            })?;
        info!(%peer, "connected to responder");

        let mut slot = Some(channel);
        let result = self.drive(&mut slot).await;
        if let Some(channel) = slot.take() {
            channel.close().await;
        }

        match &result {
            Ok(summary) => info!(
                path = %summary.path.display(),
                chunks = summary.chunks,
                bytes = summary.bytes_written,
                retries = summary.retries,
                "receive complete"
            ),
            Err(e) => error!(state = %self.state, error = %e, "receive failed"),
        }
        result
    }

    async fn drive(
        &mut self,
        slot: &mut Option<C::Channel>,
    ) -> Result<ReceiveSummary, TransferError> {
        self.transition(RequesterState::DiscoveringName);
        let reply = exchange(slot, Request::Filename).await?;
        let file_name = decode_filename_reply(&reply)?;
        validate_file_name(&file_name)?;
        let path = self.options.destination(&file_name);

        self.transition(RequesterState::DiscoveringChunkCount);
        let reply = exchange(slot, Request::GetMaxChunk).await?;
        let max_chunk = decode_max_chunk_reply(&reply)?;
        let total = u64::from(max_chunk) + 1;

        info!(file = %file_name, max_chunk, dest = %path.display(), "starting receive");
        report(
            self.progress.as_ref(),
            TransferProgress::Started {
                file_name: file_name.clone(),
                total,
            },
        );

        let mut appender = ChunkAppender::create(&path)?;
        let mut retries = 0u32;

        for index in 0..=max_chunk {
            self.transition(RequesterState::FetchingChunk(index));
            let (data, attempts) = self.fetch_chunk(slot, index, total).await?;
            retries = retries.saturating_add(attempts - 1);

            appender.append(&data)?;
            debug!(index, total, bytes = data.len(), "chunk appended");
            report(
                self.progress.as_ref(),
                TransferProgress::Chunk {
                    index,
                    total,
                    bytes: data.len(),
                },
            );
        }

        self.transition(RequesterState::Finishing);
        // Every chunk is on disk by now; a lost FINISHED only delays the
        // responder until its idle ceiling.
        match slot.as_mut() {
            Some(channel) => {
                if let Err(e) = channel.send(Request::Finished.encode()).await {
                    warn!(error = %e, "failed to send FINISHED");
                }
            }
            None => warn!("no channel left to send FINISHED"),
        }

        let bytes_written = appender.finish()?;
        let checksum = calculate_file_checksum(&path)?;
        info!(file = %file_name, bytes = bytes_written, sha256 = %checksum, "file received");

        self.transition(RequesterState::Done);
        Ok(ReceiveSummary {
            path,
            file_name,
            chunks: total,
            bytes_written,
            retries,
            checksum,
        })
    }

    /// Fetches chunk `index`, reconnecting and retrying under the policy.
    ///
    /// Returns the payload and the number of attempts it took.
    async fn fetch_chunk(
        &mut self,
        slot: &mut Option<C::Channel>,
        index: u32,
        total: u64,
    ) -> Result<(Vec<u8>, u32), TransferError> {
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            let result = match ensure_channel(&self.connector, slot).await {
                Ok(channel) => request_chunk(channel, index).await,
                Err(e) => Err(e),
            };

            let err = match result {
                Ok(data) => {
                    if attempt > 1 {
                        info!(index, attempt, "chunk recovered");
                    }
                    return Ok((data, attempt));
                }
                Err(e) => e,
            };

            if !self.options.retry.allows_retry(attempt) {
                return Err(TransferError::RetriesExhausted {
                    index,
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let delay = self.options.retry.delay_for_attempt(attempt);
            warn!(
                index,
                attempt,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "chunk fetch failed, reconnecting"
            );
            report(
                self.progress.as_ref(),
                TransferProgress::Retry {
                    index,
                    total,
                    attempt,
                },
            );

            self.transition(RequesterState::Reconnecting { index, attempt });
            // Never reuse a channel after a failure; the next attempt opens
            // a fresh one.
            if let Some(stale) = slot.take() {
                stale.close().await;
            }
            tokio::time::sleep(delay).await;
            self.transition(RequesterState::FetchingChunk(index));
        }
    }

    fn transition(&mut self, next: RequesterState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "requester state");
            self.state = next;
        }
    }
}

/// Returns the open channel, connecting a fresh one if the slot is empty.
async fn ensure_channel<'a, C: Connector>(
    connector: &C,
    slot: &'a mut Option<C::Channel>,
) -> Result<&'a mut C::Channel, TransferError> {
    let channel = match slot.take() {
        Some(channel) => channel,
        None => connector.connect().await?,
    };
    Ok(slot.insert(channel))
}

async fn request_chunk<Ch: RequestChannel>(
    channel: &mut Ch,
    index: u32,
) -> Result<Vec<u8>, TransferError> {
    channel.send(Request::GetChunk(index).encode()).await?;
    let reply = channel.receive().await?;
    Ok(decode_chunk_reply(index, &reply)?)
}

/// One request/reply round on the current channel, without retry.
async fn exchange<Ch: RequestChannel>(
    slot: &mut Option<Ch>,
    request: Request,
) -> Result<Vec<u8>, TransferError> {
    let channel = slot.as_mut().ok_or(ChannelError::Closed)?;
    channel.send(request.encode()).await?;
    Ok(channel.receive().await?)
}
