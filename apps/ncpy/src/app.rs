//! Runs the selected role against the loaded configuration.

use std::path::{Path, PathBuf};

use anyhow::bail;
use ncpy_channel::TcpConnector;
use ncpy_transfer::{ReceiveSummary, Requester, Responder, ServeSummary};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::Command;
use crate::config::Config;
use crate::{console, relay};

/// Progress events buffered before the console falls behind and drops some.
const PROGRESS_BUFFER: usize = 256;

/// Runs `command` until it completes or Ctrl-C is pressed.
pub async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal.cancel();
        }
    });

    match command {
        Command::Receive {
            address,
            port,
            output,
        } => {
            receive(&config, &address, port, output, &cancel).await?;
        }
        Command::Send { path, port } => {
            send(&config, &path, port.unwrap_or(config.port), cancel).await?;
        }
        Command::Relay {
            address,
            port,
            relay_port,
        } => {
            let relay_port = relay_port.unwrap_or(config.relay_port);
            relay::run(config, address, port, relay_port, cancel).await?;
        }
        Command::Help => {}
    }
    Ok(())
}

/// Fetches one file from `address:port`, printing progress.
pub async fn receive(
    config: &Config,
    address: &str,
    port: u16,
    output: Option<PathBuf>,
    cancel: &CancellationToken,
) -> anyhow::Result<ReceiveSummary> {
    let connector = TcpConnector::new(format!("{address}:{port}"), config.channel_options());
    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    let printer = tokio::spawn(console::print_progress(rx));

    let mut requester = Requester::new(connector, config.requester_options(output)).with_progress(tx);
    let result = tokio::select! {
        result = requester.run() => Some(result),
        _ = cancel.cancelled() => None,
    };
    drop(requester);
    let _ = printer.await;

    let Some(result) = result else {
        bail!("receive interrupted");
    };
    let summary = result?;
    info!(file = %summary.file_name, path = %summary.path.display(), "file saved");
    Ok(summary)
}

/// Serves `path` on `port` until the requester finishes, the responder
/// goes idle or `cancel` fires.
pub async fn send(
    config: &Config,
    path: &Path,
    port: u16,
    cancel: CancellationToken,
) -> anyhow::Result<ServeSummary> {
    let responder = Responder::open(path, &config.responder_options(port)).await?;
    info!(addr = %responder.local_addr()?, file = %responder.source().name(), "serving");

    let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
    let printer = tokio::spawn(console::print_progress(rx));
    let result = responder.with_cancel(cancel).with_progress(tx).serve().await;
    let _ = printer.await;

    let summary = result?;
    info!(file = %path.display(), reason = %summary.reason, "send complete");
    Ok(summary)
}
