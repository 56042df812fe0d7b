//! Command frame codec.
//!
//! # Wire format
//!
//! ```text
//! REQUEST (all kinds):     [1 byte: kind][4 bytes: i32, native endian]
//! FILENAME reply:          [1 byte: kind][name bytes][0x00]
//! GET_MAX_CHUNK reply:     [1 byte: kind][4 bytes: i32 max_chunk]
//! GET_CHUNK reply:         [1 byte: kind][4 bytes: i32 index][chunk bytes]
//! FINISHED:                no reply
//! ```
//!
//! Integers are written in platform byte order, so both ends must share
//! endianness. Payload lengths are never encoded: the transport delivers
//! whole messages and the payload is whatever follows the header.

use std::fmt;

use crate::constants::{HEADER_LEN, KIND_LEN};
use crate::error::ProtocolError;

/// Discriminator byte of a command frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Filename = 0x01,
    GetMaxChunk = 0x02,
    GetChunk = 0x03,
    Finished = 0x04,
}

impl CommandKind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Header length of this kind's reply frame.
    pub fn reply_header_len(self) -> usize {
        match self {
            CommandKind::Filename => KIND_LEN,
            _ => HEADER_LEN,
        }
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(CommandKind::Filename),
            0x02 => Ok(CommandKind::GetMaxChunk),
            0x03 => Ok(CommandKind::GetChunk),
            0x04 => Ok(CommandKind::Finished),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Filename => "FILENAME",
            CommandKind::GetMaxChunk => "GET_MAX_CHUNK",
            CommandKind::GetChunk => "GET_CHUNK",
            CommandKind::Finished => "FINISHED",
        };
        f.write_str(name)
    }
}

/// A decoded frame with a 5-byte header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: CommandKind,
    pub aux: i32,
    pub payload: Vec<u8>,
}

/// Encodes a bare 5-byte frame.
pub fn encode(kind: CommandKind, aux: i32) -> Vec<u8> {
    encode_with_payload(kind, aux, &[])
}

/// Encodes a 5-byte header followed by `payload`.
pub fn encode_with_payload(kind: CommandKind, aux: i32, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(kind.as_byte());
    buf.extend_from_slice(&aux.to_ne_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Encodes a filename reply: kind byte, name bytes, NUL terminator.
pub fn encode_filename(name: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(KIND_LEN + name.len() + 1);
    buf.push(CommandKind::Filename.as_byte());
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
    buf
}

/// Decodes a frame with a 5-byte header, requiring its kind to be `expected`.
pub fn decode(expected: CommandKind, frame: &[u8]) -> Result<Frame, ProtocolError> {
    check_kind(expected, frame)?;
    if frame.len() < HEADER_LEN {
        return Err(ProtocolError::TooShort {
            needed: HEADER_LEN,
            got: frame.len(),
        });
    }

    Ok(Frame {
        kind: expected,
        aux: read_aux(frame),
        payload: frame[HEADER_LEN..].to_vec(),
    })
}

/// Decodes a filename reply.
///
/// Trailing NUL bytes are stripped. Empty or non-UTF-8 names are rejected.
pub fn decode_filename(frame: &[u8]) -> Result<String, ProtocolError> {
    check_kind(CommandKind::Filename, frame)?;

    let body = &frame[KIND_LEN..];
    let end = body.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let name = std::str::from_utf8(&body[..end])
        .map_err(|e| ProtocolError::InvalidName(format!("not UTF-8: {e}")))?;
    if name.is_empty() {
        return Err(ProtocolError::InvalidName("empty name".into()));
    }
    Ok(name.to_string())
}

/// Reads the auxiliary integer of a frame already known to hold a full header.
pub(crate) fn read_aux(frame: &[u8]) -> i32 {
    i32::from_ne_bytes([frame[1], frame[2], frame[3], frame[4]])
}

fn check_kind(expected: CommandKind, frame: &[u8]) -> Result<(), ProtocolError> {
    match frame.first() {
        None => Err(ProtocolError::TooShort {
            needed: expected.reply_header_len(),
            got: 0,
        }),
        Some(&got) if got != expected.as_byte() => Err(ProtocolError::Mismatch { expected, got }),
        Some(_) => Ok(()),
    }
}
