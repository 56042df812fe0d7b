//! Message framing on the TCP stream.
//!
//! # Wire format
//!
//! ```text
//! MESSAGE: [4 bytes BE: len][len bytes: message]
//! ```
//!
//! Each request and each reply is exactly one message. The length prefix
//! is a transport detail; the protocol above sees whole messages only.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::ChannelError;

/// Length prefix size in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// A byte stream split into length-delimited messages.
pub type MessageStream<T> = Framed<T, LengthDelimitedCodec>;

/// Wraps `io` in the message framing, rejecting messages over `max_message_len`.
pub fn framed<T: AsyncRead + AsyncWrite>(io: T, max_message_len: usize) -> MessageStream<T> {
    LengthDelimitedCodec::builder()
        .length_field_length(LENGTH_PREFIX_LEN)
        .max_frame_length(max_message_len)
        .new_framed(io)
}

/// Writes one message, bounded by `timeout`.
pub async fn send_message<T: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut MessageStream<T>,
    message: Vec<u8>,
    max_message_len: usize,
    timeout: Duration,
) -> Result<(), ChannelError> {
    if message.len() > max_message_len {
        return Err(ChannelError::FrameTooLarge {
            len: message.len(),
            max: max_message_len,
        });
    }

    match tokio::time::timeout(timeout, stream.send(Bytes::from(message))).await {
        Ok(result) => result.map_err(ChannelError::from),
        Err(_) => Err(ChannelError::Timeout),
    }
}

/// Reads one message, bounded by `timeout`.
///
/// A cleanly closed stream yields [`ChannelError::Closed`].
pub async fn recv_message<T: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut MessageStream<T>,
    timeout: Duration,
) -> Result<Vec<u8>, ChannelError> {
    match tokio::time::timeout(timeout, stream.next()).await {
        Ok(Some(Ok(message))) => Ok(message.to_vec()),
        Ok(Some(Err(e))) => Err(e.into()),
        Ok(None) => Err(ChannelError::Closed),
        Err(_) => Err(ChannelError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn message_roundtrip() {
        let (a, b) = tokio::io::duplex(4096);
        let mut a = framed(a, 1024);
        let mut b = framed(b, 1024);

        send_message(&mut a, b"hello".to_vec(), 1024, TIMEOUT)
            .await
            .unwrap();
        send_message(&mut a, Vec::new(), 1024, TIMEOUT).await.unwrap();

        assert_eq!(recv_message(&mut b, TIMEOUT).await.unwrap(), b"hello");
        assert!(recv_message(&mut b, TIMEOUT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_message_not_sent() {
        let (a, _b) = tokio::io::duplex(4096);
        let mut a = framed(a, 8);

        let result = send_message(&mut a, vec![0u8; 9], 8, TIMEOUT).await;
        assert!(matches!(
            result,
            Err(ChannelError::FrameTooLarge { len: 9, max: 8 })
        ));
    }

    #[tokio::test]
    async fn oversized_message_rejected_by_receiver() {
        let (a, b) = tokio::io::duplex(4096);
        let mut a = framed(a, 1024);
        let mut b = framed(b, 8);

        send_message(&mut a, vec![0u8; 64], 1024, TIMEOUT)
            .await
            .unwrap();
        assert!(matches!(
            recv_message(&mut b, TIMEOUT).await,
            Err(ChannelError::Io(_))
        ));
    }

    #[tokio::test]
    async fn closed_stream_reported() {
        let (a, b) = tokio::io::duplex(4096);
        drop(a);
        let mut b = framed(b, 1024);
        assert!(matches!(
            recv_message(&mut b, TIMEOUT).await,
            Err(ChannelError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn receive_times_out() {
        let (_a, b) = tokio::io::duplex(4096);
        let mut b = framed(b, 1024);
        assert!(matches!(
            recv_message(&mut b, Duration::from_secs(10)).await,
            Err(ChannelError::Timeout)
        ));
    }
}
