//! Relay mode: receive a file from upstream, then serve it downstream.
//!
//! The two roles run as separate tasks. The receiving task hands the
//! completed path to the serving task through a one-shot channel; the
//! serving task opens nothing until that hand-off arrives.

use std::path::PathBuf;

use anyhow::Context;
use ncpy_transfer::ServeSummary;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app;
use crate::config::Config;

/// Receives from `address:port`, then serves the result on `relay_port`.
pub async fn run(
    config: Config,
    address: String,
    port: u16,
    relay_port: u16,
    cancel: CancellationToken,
) -> anyhow::Result<Option<ServeSummary>> {
    let (handoff, completed) = oneshot::channel::<PathBuf>();

    let recv_config = config.clone();
    let recv_cancel = cancel.clone();
    let receiver = tokio::spawn(async move {
        let summary = app::receive(&recv_config, &address, port, None, &recv_cancel).await?;
        if handoff.send(summary.path.clone()).is_err() {
            tracing::warn!("serving task is gone; file not relayed");
        }
        anyhow::Ok(summary)
    });

    let server = tokio::spawn(serve_when_ready(config, relay_port, completed, cancel));

    let received = receiver.await.context("receiving task panicked")?;
    let served = server.await.context("serving task panicked")?;

    received.context("relay receive failed")?;
    served
}

/// Waits for the completed file, then serves it on `port`.
///
/// Returns `None` when the hand-off is dropped because the receive failed.
async fn serve_when_ready(
    config: Config,
    port: u16,
    completed: oneshot::Receiver<PathBuf>,
    cancel: CancellationToken,
) -> anyhow::Result<Option<ServeSummary>> {
    let path = tokio::select! {
        path = completed => match path {
            Ok(path) => path,
            Err(_) => {
                info!("nothing received; relay not serving");
                return Ok(None);
            }
        },
        _ = cancel.cancelled() => return Ok(None),
    };

    info!(path = %path.display(), port, "relaying received file");
    let summary = app::send(&config, &path, port, cancel).await?;
    Ok(Some(summary))
}
