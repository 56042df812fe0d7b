//! Typed requests and reply helpers built on the frame codec.

use crate::command::{self, CommandKind, read_aux};
use crate::constants::HEADER_LEN;
use crate::error::ProtocolError;

/// A request sent by the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Filename,
    GetMaxChunk,
    GetChunk(u32),
    Finished,
}

impl Request {
    pub fn kind(&self) -> CommandKind {
        match self {
            Request::Filename => CommandKind::Filename,
            Request::GetMaxChunk => CommandKind::GetMaxChunk,
            Request::GetChunk(_) => CommandKind::GetChunk,
            Request::Finished => CommandKind::Finished,
        }
    }

    /// Encodes the request as a 5-byte frame (auxiliary 0 unless a chunk index).
    pub fn encode(&self) -> Vec<u8> {
        let aux = match self {
            Request::GetChunk(index) => wire_int(*index),
            _ => 0,
        };
        command::encode(self.kind(), aux)
    }

    /// Decodes a request frame as received by the responder.
    ///
    /// Frames shorter than the 5-byte header and unknown kinds are errors.
    /// Bytes past the header are ignored.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::TooShort {
                needed: HEADER_LEN,
                got: frame.len(),
            });
        }

        let request = match CommandKind::try_from(frame[0])? {
            CommandKind::Filename => Request::Filename,
            CommandKind::GetMaxChunk => Request::GetMaxChunk,
            CommandKind::GetChunk => Request::GetChunk(non_negative(read_aux(frame))?),
            CommandKind::Finished => Request::Finished,
        };
        Ok(request)
    }
}

/// Encodes a `FILENAME` reply.
pub fn filename_reply(name: &str) -> Vec<u8> {
    command::encode_filename(name)
}

/// Encodes a `GET_MAX_CHUNK` reply.
pub fn max_chunk_reply(max_chunk: u32) -> Vec<u8> {
    command::encode(CommandKind::GetMaxChunk, wire_int(max_chunk))
}

/// Encodes a `GET_CHUNK` reply carrying chunk `index`.
pub fn chunk_reply(index: u32, data: &[u8]) -> Vec<u8> {
    command::encode_with_payload(CommandKind::GetChunk, wire_int(index), data)
}

/// Decodes a `FILENAME` reply into the advertised file name.
pub fn decode_filename_reply(frame: &[u8]) -> Result<String, ProtocolError> {
    command::decode_filename(frame)
}

/// Decodes a `GET_MAX_CHUNK` reply into the last chunk index.
pub fn decode_max_chunk_reply(frame: &[u8]) -> Result<u32, ProtocolError> {
    let frame = command::decode(CommandKind::GetMaxChunk, frame)?;
    non_negative(frame.aux)
}

/// Decodes a `GET_CHUNK` reply, requiring it to carry chunk `expected`.
pub fn decode_chunk_reply(expected: u32, frame: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let frame = command::decode(CommandKind::GetChunk, frame)?;
    if frame.aux < 0 || frame.aux as u32 != expected {
        return Err(ProtocolError::IndexMismatch {
            expected,
            got: frame.aux,
        });
    }
    Ok(frame.payload)
}

fn non_negative(value: i32) -> Result<u32, ProtocolError> {
    u32::try_from(value).map_err(|_| ProtocolError::NegativeValue(value))
}

// Indices come from a `ChunkLayout`, which caps them at `i32::MAX`.
fn wire_int(value: u32) -> i32 {
    debug_assert!(value <= i32::MAX as u32);
    value as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip() {
        for request in [
            Request::Filename,
            Request::GetMaxChunk,
            Request::GetChunk(0),
            Request::GetChunk(41),
            Request::Finished,
        ] {
            let frame = request.encode();
            assert_eq!(frame.len(), HEADER_LEN);
            assert_eq!(Request::decode(&frame).unwrap(), request);
        }
    }

    #[test]
    fn non_chunk_requests_carry_zero() {
        let frame = Request::Filename.encode();
        assert_eq!(&frame[1..], &0i32.to_ne_bytes());
    }

    #[test]
    fn short_request_rejected() {
        let err = Request::decode(&[0x03, 1, 0]).unwrap_err();
        assert_eq!(err, ProtocolError::TooShort { needed: 5, got: 3 });
    }

    #[test]
    fn unknown_request_rejected() {
        let frame = [0x42, 0, 0, 0, 0];
        assert_eq!(
            Request::decode(&frame).unwrap_err(),
            ProtocolError::UnknownCommand(0x42)
        );
    }

    #[test]
    fn negative_chunk_index_rejected() {
        let frame = command::encode(CommandKind::GetChunk, -1);
        assert_eq!(
            Request::decode(&frame).unwrap_err(),
            ProtocolError::NegativeValue(-1)
        );
    }

    #[test]
    fn max_chunk_reply_decodes() {
        let frame = max_chunk_reply(2);
        assert_eq!(decode_max_chunk_reply(&frame).unwrap(), 2);
    }

    #[test]
    fn chunk_reply_with_wrong_index_rejected() {
        let frame = chunk_reply(3, b"EFGH");
        assert_eq!(
            decode_chunk_reply(4, &frame).unwrap_err(),
            ProtocolError::IndexMismatch {
                expected: 4,
                got: 3
            }
        );
        assert_eq!(decode_chunk_reply(3, &frame).unwrap(), b"EFGH");
    }

    #[test]
    fn chunk_reply_expected_but_filename_received() {
        let frame = filename_reply("x.bin");
        assert!(matches!(
            decode_chunk_reply(0, &frame),
            Err(ProtocolError::Mismatch {
                expected: CommandKind::GetChunk,
                ..
            })
        ));
    }

    #[test]
    fn filename_reply_decodes() {
        let frame = filename_reply("report.pdf");
        assert_eq!(decode_filename_reply(&frame).unwrap(), "report.pdf");
    }
}
