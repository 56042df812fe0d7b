//! Request side of the channel.
//!
//! Connects to a responder and exchanges one request/reply pair at a time.

use bytes::Bytes;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ChannelError;
use crate::wire::{MessageStream, framed, recv_message, send_message};
use crate::{ChannelOptions, Connector, RequestChannel};

/// A connected request socket.
pub struct ReqSocket {
    addr: String,
    stream: MessageStream<TcpStream>,
    options: ChannelOptions,
}

impl ReqSocket {
    /// Connects to `addr`, bounded by the send timeout.
    pub async fn connect(addr: &str, options: ChannelOptions) -> Result<Self, ChannelError> {
        let stream =
            match tokio::time::timeout(options.send_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(s)) => s,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Err(ChannelError::Timeout),
            };
        stream.set_nodelay(true)?;

        debug!(addr, "request channel connected");

        Ok(Self {
            addr: addr.to_string(),
            stream: framed(stream, options.max_message_len),
            options,
        })
    }

    pub async fn send(&mut self, message: Vec<u8>) -> Result<(), ChannelError> {
        send_message(
            &mut self.stream,
            message,
            self.options.max_message_len,
            self.options.send_timeout,
        )
        .await
    }

    pub async fn receive(&mut self) -> Result<Vec<u8>, ChannelError> {
        recv_message(&mut self.stream, self.options.recv_timeout).await
    }

    /// Flushes and shuts down the connection, ignoring errors.
    pub async fn close(mut self) {
        let _ = tokio::time::timeout(
            self.options.send_timeout,
            SinkExt::<Bytes>::close(&mut self.stream),
        )
        .await;
        debug!(addr = %self.addr, "request channel closed");
    }
}

impl RequestChannel for ReqSocket {
    async fn send(&mut self, message: Vec<u8>) -> Result<(), ChannelError> {
        ReqSocket::send(self, message).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>, ChannelError> {
        ReqSocket::receive(self).await
    }

    async fn close(self) {
        ReqSocket::close(self).await
    }
}

/// Opens [`ReqSocket`]s to a fixed address.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    options: ChannelOptions,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>, options: ChannelOptions) -> Self {
        Self {
            addr: addr.into(),
            options,
        }
    }
}

impl Connector for TcpConnector {
    type Channel = ReqSocket;

    fn peer(&self) -> String {
        self.addr.clone()
    }

    async fn connect(&self) -> Result<ReqSocket, ChannelError> {
        ReqSocket::connect(&self.addr, self.options).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::rep::RepSocket;

    fn short() -> ChannelOptions {
        ChannelOptions::with_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn request_reply_exchange() {
        let mut rep = RepSocket::bind("127.0.0.1:0", ChannelOptions::default())
            .await
            .unwrap();
        let addr = rep.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let request = rep.receive().await.unwrap().unwrap();
            let mut reply = request.clone();
            reply.reverse();
            rep.reply(reply).await.unwrap();
        });

        let mut req = ReqSocket::connect(&addr, ChannelOptions::default())
            .await
            .unwrap();
        req.send(b"abc".to_vec()).await.unwrap();
        assert_eq!(req.receive().await.unwrap(), b"cba");
        req.close().await;

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused() {
        // Bind and drop to obtain a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = ReqSocket::connect(&addr, short()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn receive_without_reply_times_out() {
        let rep = RepSocket::bind("127.0.0.1:0", ChannelOptions::default())
            .await
            .unwrap();
        let addr = rep.local_addr().unwrap().to_string();

        let mut req = ReqSocket::connect(&addr, short()).await.unwrap();
        req.send(b"ping".to_vec()).await.unwrap();
        assert!(matches!(req.receive().await, Err(ChannelError::Timeout)));
    }

    #[tokio::test]
    async fn connector_opens_fresh_sockets() {
        let mut rep = RepSocket::bind("127.0.0.1:0", short()).await.unwrap();
        let addr = rep.local_addr().unwrap().to_string();
        let connector = TcpConnector::new(addr.clone(), ChannelOptions::default());
        assert_eq!(connector.peer(), addr);

        let server = tokio::spawn(async move {
            let mut served = 0;
            while served < 2 {
                if let Some(msg) = rep.receive().await.unwrap() {
                    rep.reply(msg).await.unwrap();
                    served += 1;
                }
            }
        });

        let mut first = connector.connect().await.unwrap();
        first.send(b"one".to_vec()).await.unwrap();
        assert_eq!(first.receive().await.unwrap(), b"one");
        first.close().await;

        let mut second = connector.connect().await.unwrap();
        second.send(b"two".to_vec()).await.unwrap();
        assert_eq!(second.receive().await.unwrap(), b"two");
        second.close().await;

        server.await.unwrap();
    }
}
