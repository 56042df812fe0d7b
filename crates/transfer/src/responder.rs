//! Server role: serves one source file until the requester finishes,
//! the idle ceiling is reached or the session is cancelled.

use std::net::SocketAddr;
use std::path::Path;

use ncpy_channel::{ChannelOptions, RepSocket};
use ncpy_protocol::constants::{DEFAULT_IDLE_CEILING, DEFAULT_PORT};
use ncpy_protocol::messages::{chunk_reply, filename_reply, max_chunk_reply};
use ncpy_protocol::{CHUNK_SIZE, Request};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::TransferError;
use crate::chunked::{SourceFile, calculate_file_checksum};
use crate::progress::{TransferProgress, report};
use crate::types::{ServeSummary, ShutdownReason};

/// Binding and pacing of a responder session.
#[derive(Debug, Clone)]
pub struct ResponderOptions {
    /// Address the reply channel binds to.
    pub bind_addr: String,
    /// Bytes per chunk. 0 selects [`CHUNK_SIZE`].
    pub chunk_size: usize,
    /// Timeouts; `recv_timeout` is the length of one idle cycle.
    pub channel: ChannelOptions,
    /// Consecutive empty receive cycles before shutting down.
    pub idle_ceiling: u32,
}

impl Default for ResponderOptions {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            chunk_size: CHUNK_SIZE,
            channel: ChannelOptions::default(),
            idle_ceiling: DEFAULT_IDLE_CEILING,
        }
    }
}

/// Serves one file over a bound reply channel.
pub struct Responder {
    source: SourceFile,
    socket: RepSocket,
    idle_ceiling: u32,
    cancel: Option<CancellationToken>,
    progress: Option<mpsc::Sender<TransferProgress>>,
}

impl Responder {
    /// Opens the source file, then binds the reply channel.
    ///
    /// Nothing is bound when the source is missing, unreadable or empty.
    pub async fn open(path: &Path, options: &ResponderOptions) -> Result<Self, TransferError> {
        let source = SourceFile::open(path, options.chunk_size)?;
        let checksum = calculate_file_checksum(path)?;
        info!(
            file = %source.name(),
            path = %source.path().display(),
            size = source.size(),
            max_chunk = source.max_chunk(),
            sha256 = %checksum,
            "source ready"
        );

        let socket = RepSocket::bind(&options.bind_addr, options.channel)
            .await
            .map_err(|source| TransferError::Bind {
                addr: options.bind_addr.clone(),
                source,
            })?;

        Ok(Self {
            source,
            socket,
            idle_ceiling: options.idle_ceiling.max(1),
            cancel: None,
            progress: None,
        })
    }

    /// Stops serving when `token` is cancelled.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attaches a channel that receives a [`TransferProgress::Sent`] per chunk.
    pub fn with_progress(mut self, tx: mpsc::Sender<TransferProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransferError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    /// Answers requests until a shutdown condition; releases the channel.
    pub async fn serve(mut self) -> Result<ServeSummary, TransferError> {
        let result = self.serve_loop().await;
        let Self { source, socket, .. } = self;
        socket.close();

        match result {
            Ok((reason, chunks_served)) => {
                info!(file = %source.name(), %reason, chunks_served, "responder stopped");
                Ok(ServeSummary {
                    reason,
                    file_name: source.name().to_string(),
                    chunks_served,
                })
            }
            Err(e) => {
                error!(file = %source.name(), error = %e, "responder failed");
                Err(e)
            }
        }
    }

    async fn serve_loop(&mut self) -> Result<(ShutdownReason, u64), TransferError> {
        let cancel = self.cancel.clone().unwrap_or_else(CancellationToken::new);
        let total = self.source.layout().chunk_count();
        let mut idle: u32 = 0;
        let mut chunks_served: u64 = 0;

        loop {
            let received = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok((ShutdownReason::Cancelled, chunks_served)),
                received = self.socket.receive() => received,
            };

            let frame = match received {
                Ok(Some(frame)) if !frame.is_empty() => frame,
                // An empty message counts as an idle cycle, like a timeout.
                Ok(_) => {
                    idle += 1;
                    debug!(idle, ceiling = self.idle_ceiling, "no request within timeout");
                    if idle >= self.idle_ceiling {
                        info!(
                            ceiling = self.idle_ceiling,
                            "no request for {} receive cycles, shutting down", self.idle_ceiling
                        );
                        return Ok((ShutdownReason::Idle, chunks_served));
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let request = Request::decode(&frame)?;
            idle = 0;

            match request {
                Request::Finished => {
                    info!("requester finished");
                    return Ok((ShutdownReason::Finished, chunks_served));
                }
                Request::Filename => {
                    debug!(name = %self.source.name(), "FILENAME");
                    self.reply(filename_reply(self.source.name())).await;
                }
                Request::GetMaxChunk => {
                    debug!(max_chunk = self.source.max_chunk(), "GET_MAX_CHUNK");
                    self.reply(max_chunk_reply(self.source.max_chunk())).await;
                }
                Request::GetChunk(index) => {
                    let data = self.source.read_chunk(index)?;
                    if self.reply(chunk_reply(index, &data)).await {
                        chunks_served += 1;
                        debug!(index, total, bytes = data.len(), "chunk sent");
                        report(self.progress.as_ref(), TransferProgress::Sent { index, total });
                    }
                }
            }
        }
    }

    /// Sends a reply. A failed reply is not fatal: the requester times out
    /// and reconnects.
    async fn reply(&mut self, frame: Vec<u8>) -> bool {
        match self.socket.reply(frame).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "reply failed, waiting for requester to reconnect");
                false
            }
        }
    }
}
