//! Request/reply message channel over TCP.
//!
//! A [`RepSocket`] serves one requester at a time: every message it receives
//! is answered with exactly one reply before the next is read. A
//! [`ReqSocket`] sends one request and waits for its reply. Messages are
//! length-delimited (see [`wire`]), so receivers always know a message's
//! size before reading it.
//!
//! The [`RequestChannel`] and [`Connector`] traits are the seams the
//! transfer requester is written against. A connector hands out a fresh
//! channel on every call, which is how a requester recovers from a broken
//! connection.

pub mod error;
pub mod rep;
pub mod req;
pub mod wire;

pub use error::ChannelError;
pub use rep::RepSocket;
pub use req::{ReqSocket, TcpConnector};

use std::future::Future;
use std::time::Duration;

use ncpy_protocol::DEFAULT_TIMEOUT;

/// Largest message accepted or sent (16 MiB).
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// Per-channel timeouts and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOptions {
    /// Bound on connecting and on each send.
    pub send_timeout: Duration,
    /// Bound on each receive.
    pub recv_timeout: Duration,
    /// Largest message in bytes, excluding the length prefix.
    pub max_message_len: usize,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_TIMEOUT,
            recv_timeout: DEFAULT_TIMEOUT,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

impl ChannelOptions {
    /// Uses `timeout` for both directions.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            send_timeout: timeout,
            recv_timeout: timeout,
            ..Self::default()
        }
    }
}

/// Client half of a request/reply exchange.
pub trait RequestChannel: Send {
    /// Sends one request message.
    fn send(&mut self, message: Vec<u8>) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Waits for the reply to the last request.
    fn receive(&mut self) -> impl Future<Output = Result<Vec<u8>, ChannelError>> + Send;

    /// Releases the channel. It cannot be used afterwards.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Produces connected request channels to a fixed peer.
pub trait Connector: Send + Sync {
    type Channel: RequestChannel;

    /// Human-readable description of the peer, for logs and errors.
    fn peer(&self) -> String;

    /// Opens a new channel with the connector's timeouts applied.
    fn connect(&self) -> impl Future<Output = Result<Self::Channel, ChannelError>> + Send;
}
