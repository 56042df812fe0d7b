//! Error types for frame encoding and decoding.

use crate::command::CommandKind;

/// Errors produced while decoding command frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame too short: need {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },

    #[error("command mismatch: expected {expected}, got 0x{got:02x}")]
    Mismatch { expected: CommandKind, got: u8 },

    #[error("unknown command 0x{0:02x}")]
    UnknownCommand(u8),

    #[error("chunk index mismatch: expected {expected}, got {got}")]
    IndexMismatch { expected: u32, got: i32 },

    #[error("negative value on the wire: {0}")]
    NegativeValue(i32),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("file is empty")]
    EmptyFile,

    #[error("file too large: {0} chunks")]
    TooManyChunks(u64),
}
