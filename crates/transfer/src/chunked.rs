use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ncpy_protocol::{ChunkLayout, ProtocolError};
use sha2::{Digest, Sha256};

use crate::TransferError;

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Computes SHA-256 of an entire file and returns the hex-encoded digest.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Size of the file at `path` in bytes.
pub fn file_size(path: &Path) -> Result<u64, TransferError> {
    Ok(std::fs::metadata(path)?.len())
}

/// Last component of `path`, splitting on both `/` and `\`.
pub fn bare_file_name(path: &Path) -> Option<String> {
    let full = path.to_string_lossy();
    let name = full.rsplit(['/', '\\']).next()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

// ---------------------------------------------------------------------------
// SourceFile
// ---------------------------------------------------------------------------

/// Read-only view of the file being served, split into chunks.
pub struct SourceFile {
    file: File,
    path: PathBuf,
    name: String,
    layout: ChunkLayout,
}

impl SourceFile {
    /// Opens `path` and computes its chunk layout.
    ///
    /// Missing, unreadable and empty files are rejected. A `chunk_size`
    /// of 0 selects the protocol default.
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let display = path.display().to_string();
        let unavailable = |source| TransferError::SourceUnavailable {
            path: display.clone(),
            source,
        };

        let file = File::open(path).map_err(unavailable)?;
        let metadata = file.metadata().map_err(unavailable)?;
        if !metadata.is_file() {
            return Err(TransferError::SourceUnavailable {
                path: display,
                source: std::io::Error::other("not a regular file"),
            });
        }

        let layout = ChunkLayout::new(metadata.len(), chunk_size).map_err(|e| match e {
            ProtocolError::EmptyFile => TransferError::EmptySource(display.clone()),
            other => TransferError::Protocol(other),
        })?;

        let name = bare_file_name(path)
            .ok_or_else(|| TransferError::InvalidPath(format!("no file name in {display}")))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            name,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name advertised to requesters (no directories).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    pub fn size(&self) -> u64 {
        self.layout.file_size()
    }

    pub fn max_chunk(&self) -> u32 {
        self.layout.max_chunk()
    }

    /// Reads exactly `len` bytes starting at `offset`.
    pub fn read_range(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, TransferError> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads chunk `index`, rejecting indices past the last chunk.
    pub fn read_chunk(&mut self, index: u32) -> Result<Vec<u8>, TransferError> {
        let len = self
            .layout
            .chunk_len(index)
            .ok_or(TransferError::ChunkOutOfRange {
                index,
                max_chunk: self.layout.max_chunk(),
            })?;
        self.read_range(self.layout.offset(index), len)
    }
}

// ---------------------------------------------------------------------------
// ChunkAppender
// ---------------------------------------------------------------------------

/// Appends received chunks to the destination file, in order.
pub struct ChunkAppender {
    file: File,
    written: u64,
}

impl ChunkAppender {
    /// Creates `path` empty, truncating any previous content.
    ///
    /// Creates intermediate directories as needed.
    pub fn create(path: &Path) -> Result<Self, TransferError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            file,
            written: 0,
        })
    }

    /// Appends `data` after everything written so far.
    pub fn append(&mut self, data: &[u8]) -> Result<(), TransferError> {
        self.file.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Total bytes appended.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flushes to disk and returns the total bytes written.
    pub fn finish(self) -> Result<u64, TransferError> {
        self.file.sync_all()?;
        Ok(self.written)
    }
}
