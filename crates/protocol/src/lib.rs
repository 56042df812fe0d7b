//! Wire protocol for ncpy chunked file transfers.
//!
//! Every exchange is a single request answered by a single reply. Frames
//! carry a 1-byte command kind and, for most commands, a 4-byte auxiliary
//! integer. See [`command`] for the exact layouts.

pub mod command;
pub mod constants;
pub mod error;
pub mod layout;
pub mod messages;

pub use command::{CommandKind, Frame};
pub use constants::{CHUNK_SIZE, DEFAULT_IDLE_CEILING, DEFAULT_TIMEOUT, HEADER_LEN, KIND_LEN};
pub use error::ProtocolError;
pub use layout::ChunkLayout;
pub use messages::Request;
