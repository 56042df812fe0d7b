//! Reply side of the channel.
//!
//! Binds a listener and serves a single requester at a time. A newly
//! accepted connection replaces the current one, so a requester that
//! reconnects after a failure picks up where it left off.

use std::net::SocketAddr;

use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::ChannelOptions;
use crate::error::ChannelError;
use crate::wire::{MessageStream, framed, send_message};

type Peer = (SocketAddr, MessageStream<TcpStream>);

/// A bound reply socket.
pub struct RepSocket {
    listener: TcpListener,
    peer: Option<Peer>,
    options: ChannelOptions,
}

impl RepSocket {
    /// Binds a listener at `addr`.
    pub async fn bind(addr: &str, options: ChannelOptions) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "reply channel bound");

        Ok(Self {
            listener,
            peer: None,
            options,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChannelError> {
        Ok(self.listener.local_addr()?)
    }

    /// Address of the requester currently being served, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer.as_ref().map(|(addr, _)| *addr)
    }

    /// Waits up to the receive timeout for the next request.
    ///
    /// Returns `Ok(None)` when the timeout elapses without a message.
    /// Connections accepted meanwhile replace the current peer; a peer
    /// that disconnects or sends a malformed stream is dropped.
    pub async fn receive(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        let deadline = Instant::now() + self.options.recv_timeout;
        let max_message_len = self.options.max_message_len;

        loop {
            let Self { listener, peer, .. } = &mut *self;

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(%addr, error = %e, "failed to set TCP_NODELAY");
                        }
                        let stream = framed(stream, max_message_len);
                        match peer.replace((addr, stream)) {
                            Some((old, _)) => info!(%old, new = %addr, "requester replaced"),
                            None => info!(%addr, "requester connected"),
                        }
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                message = next_message(peer) => match message {
                    Some(Ok(message)) => return Ok(Some(message.to_vec())),
                    Some(Err(e)) => {
                        warn!(error = %e, "dropping requester after stream error");
                        *peer = None;
                    }
                    None => {
                        debug!("requester disconnected");
                        *peer = None;
                    }
                },
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }

    /// Sends the reply to the last received request.
    ///
    /// On failure the peer is dropped; it is expected to reconnect.
    pub async fn reply(&mut self, message: Vec<u8>) -> Result<(), ChannelError> {
        let Some((_, stream)) = self.peer.as_mut() else {
            return Err(ChannelError::Closed);
        };

        let result = send_message(
            stream,
            message,
            self.options.max_message_len,
            self.options.send_timeout,
        )
        .await;
        if result.is_err() {
            self.peer = None;
        }
        result
    }

    /// Drops the current peer and the listener.
    pub fn close(self) {
        if let Some(addr) = self.peer_addr() {
            debug!(%addr, "closing reply channel with connected requester");
        }
    }
}

async fn next_message(peer: &mut Option<Peer>) -> Option<Result<BytesMut, std::io::Error>> {
    match peer {
        Some((_, stream)) => stream.next().await,
        None => std::future::pending().await,
    }
}
