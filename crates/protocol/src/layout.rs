//! Chunk arithmetic shared by both roles.

use crate::constants::CHUNK_SIZE;
use crate::error::ProtocolError;

/// How a file of a given size splits into fixed-size chunks.
///
/// Every chunk is `chunk_size` bytes except the last, which holds the
/// remainder. Chunk lengths always sum to `file_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    file_size: u64,
    chunk_size: usize,
    max_chunk: u32,
}

impl ChunkLayout {
    /// Computes the layout of a `file_size`-byte file.
    ///
    /// A `chunk_size` of 0 selects [`CHUNK_SIZE`]. Empty files have no layout,
    /// and the last index must fit the wire's signed 32-bit integer.
    pub fn new(file_size: u64, chunk_size: usize) -> Result<Self, ProtocolError> {
        if file_size == 0 {
            return Err(ProtocolError::EmptyFile);
        }
        let chunk_size = if chunk_size == 0 { CHUNK_SIZE } else { chunk_size };

        let step = chunk_size as u64;
        let last = file_size.div_ceil(step) - 1;
        if last > i32::MAX as u64 {
            return Err(ProtocolError::TooManyChunks(last + 1));
        }

        Ok(Self {
            file_size,
            chunk_size,
            max_chunk: last as u32,
        })
    }

    /// Index of the last chunk.
    pub fn max_chunk(&self) -> u32 {
        self.max_chunk
    }

    /// Number of chunks (`max_chunk + 1`).
    pub fn chunk_count(&self) -> u64 {
        self.max_chunk as u64 + 1
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Byte offset of chunk `index`.
    pub fn offset(&self, index: u32) -> u64 {
        index as u64 * self.chunk_size as u64
    }

    /// Length of chunk `index`, or `None` past the last chunk.
    pub fn chunk_len(&self, index: u32) -> Option<usize> {
        if index > self.max_chunk {
            return None;
        }
        if index < self.max_chunk {
            return Some(self.chunk_size);
        }
        Some((self.file_size - self.offset(index)) as usize)
    }
}
