//! Single-line progress display on stderr.

use std::io::Write;

use ncpy_transfer::TransferProgress;
use tokio::sync::mpsc;

/// Prints progress events until every sender is dropped.
pub async fn print_progress(mut rx: mpsc::Receiver<TransferProgress>) {
    let mut errors = 0u32;
    let mut dirty = false;

    while let Some(event) = rx.recv().await {
        if matches!(event, TransferProgress::Retry { .. }) {
            errors += 1;
        }

        let mut stderr = std::io::stderr().lock();
        match event {
            TransferProgress::Started { file_name, total } => {
                if dirty {
                    let _ = writeln!(stderr);
                }
                let _ = writeln!(stderr, "{file_name}: {total} chunks");
                dirty = false;
            }
            event => {
                if let Some(line) = progress_line(&event, errors) {
                    // Clear the line, then rewrite it in place.
                    let _ = write!(stderr, "\r\x1b[2K{line}");
                    dirty = true;
                }
            }
        }
        let _ = stderr.flush();
    }

    if dirty {
        eprintln!();
    }
}

/// Text for one in-place progress line.
pub fn progress_line(event: &TransferProgress, errors: u32) -> Option<String> {
    let line = match event {
        TransferProgress::Chunk { index, total, .. }
        | TransferProgress::Retry { index, total, .. } => {
            let mut line = format!("receiving chunk {}/{total}", index + 1);
            if errors > 0 {
                line.push_str(&format!(" [recv error x{errors}]"));
            }
            line
        }
        TransferProgress::Sent { index, total } => {
            format!("sending chunk: {}/{total}", index + 1)
        }
        TransferProgress::Started { .. } => return None,
    };
    Some(line)
}
