fn main() {
    println!("Run `cargo test -p ncpy-integration` to execute end-to-end transfer tests.");
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;

    use ncpy_channel::{
        ChannelError, ChannelOptions, Connector, RepSocket, ReqSocket, RequestChannel,
        TcpConnector,
    };
    use ncpy_protocol::messages::{filename_reply, max_chunk_reply};
    use ncpy_protocol::{CHUNK_SIZE, Request};
    use ncpy_transfer::{
        Requester, RequesterOptions, Responder, ResponderOptions, RetryPolicy, ShutdownReason,
        TransferError, calculate_file_checksum, checksum_bytes,
    };
    use tempfile::TempDir;

    fn channel_options() -> ChannelOptions {
        ChannelOptions::with_timeout(Duration::from_secs(5))
    }

    fn responder_options(chunk_size: usize) -> ResponderOptions {
        ResponderOptions {
            bind_addr: "127.0.0.1:0".into(),
            chunk_size,
            channel: channel_options(),
            idle_ceiling: 10,
        }
    }

    fn requester_options(dir: &Path) -> RequesterOptions {
        RequesterOptions {
            output_dir: dir.to_path_buf(),
            output_path: None,
            retry: RetryPolicy::immediate(),
        }
    }

    /// Deterministic, non-repeating-looking test data.
    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + i / 251) as u8).collect()
    }

    fn write_source(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Serves `source` and receives it into `out_dir` over loopback.
    async fn transfer(
        source: &Path,
        chunk_size: usize,
        out_dir: &Path,
    ) -> (ncpy_transfer::ReceiveSummary, ncpy_transfer::ServeSummary) {
        let responder = Responder::open(source, &responder_options(chunk_size))
            .await
            .unwrap();
        let addr = responder.local_addr().unwrap().to_string();
        let server = tokio::spawn(responder.serve());

        let connector = TcpConnector::new(addr, channel_options());
        let mut requester = Requester::new(connector, requester_options(out_dir));
        let received = requester.run().await.unwrap();
        let served = server.await.unwrap().unwrap();
        (received, served)
    }

    #[tokio::test]
    async fn round_trip_various_sizes() {
        let src_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();

        for (size, chunk_size) in [
            (1, 4),
            (4, 4),
            (25, 10),
            (20, 10),
            (4096, 1000),
            (CHUNK_SIZE, CHUNK_SIZE),
            (CHUNK_SIZE + 1, CHUNK_SIZE),
            (3 * CHUNK_SIZE - 7, CHUNK_SIZE),
        ] {
            let data = pattern(size);
            let name = format!("file-{size}.bin");
            let source = write_source(&src_dir, &name, &data);

            let (received, served) = transfer(&source, chunk_size, out_dir.path()).await;

            let expected_chunks = size.div_ceil(chunk_size) as u64;
            assert_eq!(received.chunks, expected_chunks, "size {size}");
            assert_eq!(received.bytes_written, size as u64);
            assert_eq!(received.path, out_dir.path().join(&name));
            assert_eq!(std::fs::read(&received.path).unwrap(), data, "size {size}");
            assert_eq!(received.checksum, calculate_file_checksum(&source).unwrap());
            assert_eq!(served.reason, ShutdownReason::Finished);
            assert_eq!(served.chunks_served, expected_chunks);
        }
    }

    #[tokio::test]
    async fn letters_in_three_chunks() {
        let src_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let source = write_source(&src_dir, "letters.txt", b"ABCDEFGHI");

        let (received, served) = transfer(&source, 4, out_dir.path()).await;

        assert_eq!(received.file_name, "letters.txt");
        assert_eq!(received.chunks, 3);
        assert_eq!(std::fs::read(&received.path).unwrap(), b"ABCDEFGHI");
        assert_eq!(received.checksum, checksum_bytes(b"ABCDEFGHI"));
        assert_eq!(served.chunks_served, 3);
    }

    /// Loses the first reply to one chunk, as if the link dropped it.
    #[derive(Clone)]
    struct LossyConnector {
        inner: TcpConnector,
        lose_chunk: u32,
        lost: Arc<AtomicBool>,
        connects: Arc<AtomicU32>,
    }

    struct LossyChannel {
        inner: ReqSocket,
        lose_chunk: u32,
        lost: Arc<AtomicBool>,
        lose_next_reply: bool,
    }

    impl Connector for LossyConnector {
        type Channel = LossyChannel;

        fn peer(&self) -> String {
            self.inner.peer()
        }

        async fn connect(&self) -> Result<LossyChannel, ChannelError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(LossyChannel {
                inner: self.inner.connect().await?,
                lose_chunk: self.lose_chunk,
                lost: self.lost.clone(),
                lose_next_reply: false,
            })
        }
    }

    impl RequestChannel for LossyChannel {
        async fn send(&mut self, message: Vec<u8>) -> Result<(), ChannelError> {
            if Request::decode(&message) == Ok(Request::GetChunk(self.lose_chunk))
                && !self.lost.swap(true, Ordering::SeqCst)
            {
                self.lose_next_reply = true;
            }
            self.inner.send(message).await
        }

        async fn receive(&mut self) -> Result<Vec<u8>, ChannelError> {
            let reply = self.inner.receive().await?;
            if std::mem::take(&mut self.lose_next_reply) {
                return Err(ChannelError::Timeout);
            }
            Ok(reply)
        }

        async fn close(self) {
            self.inner.close().await
        }
    }

    #[tokio::test]
    async fn lost_reply_is_refetched_and_appended_once() {
        let src_dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let data = pattern(10 * 1000 + 17);
        let source = write_source(&src_dir, "lossy.bin", &data);

        let responder = Responder::open(&source, &responder_options(1000))
            .await
            .unwrap();
        let addr = responder.local_addr().unwrap().to_string();
        let server = tokio::spawn(responder.serve());

        let connector = LossyConnector {
            inner: TcpConnector::new(addr, channel_options()),
            lose_chunk: 4,
            lost: Arc::new(AtomicBool::new(false)),
            connects: Arc::new(AtomicU32::new(0)),
        };
        let mut requester = Requester::new(connector.clone(), requester_options(out_dir.path()));
        let received = requester.run().await.unwrap();
        let served = server.await.unwrap().unwrap();

        assert_eq!(std::fs::read(&received.path).unwrap(), data);
        assert_eq!(received.retries, 1);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        // Chunk 4 was served twice.
        assert_eq!(served.chunks_served, received.chunks + 1);
        assert_eq!(served.reason, ShutdownReason::Finished);
    }

    #[tokio::test]
    async fn unreachable_responder_fails_with_channel_status() {
        let out_dir = TempDir::new().unwrap();

        // Bind and drop to obtain a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let connector = TcpConnector::new(addr, ChannelOptions::with_timeout(Duration::from_millis(500)));
        let mut requester = Requester::new(connector, requester_options(out_dir.path()));
        let err = requester.run().await.unwrap_err();

        assert!(matches!(err, TransferError::Connect { .. }));
        assert_eq!(err.status(), ncpy_transfer::STATUS_CHANNEL_FAILED);
    }

    #[tokio::test]
    async fn silent_responder_exhausts_retry_cap() {
        let out_dir = TempDir::new().unwrap();
        let short = ChannelOptions::with_timeout(Duration::from_millis(200));

        // Answers discovery, then never replies to a chunk request.
        let mut rep = RepSocket::bind("127.0.0.1:0", short).await.unwrap();
        let addr = rep.local_addr().unwrap().to_string();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_server = stop.clone();
        let server = tokio::spawn(async move {
            while !stop_server.load(Ordering::SeqCst) {
                let Some(frame) = rep.receive().await.unwrap() else {
                    continue;
                };
                match Request::decode(&frame).unwrap() {
                    Request::Filename => rep.reply(filename_reply("stuck.bin")).await.unwrap(),
                    Request::GetMaxChunk => rep.reply(max_chunk_reply(3)).await.unwrap(),
                    _ => {}
                }
            }
        });

        let options = RequesterOptions {
            retry: RetryPolicy::immediate().with_max_attempts(3),
            ..requester_options(out_dir.path())
        };
        let mut requester = Requester::new(TcpConnector::new(addr, short), options);
        let err = requester.run().await.unwrap_err();

        assert!(matches!(
            err,
            TransferError::RetriesExhausted {
                index: 0,
                attempts: 3,
                ..
            }
        ));
        assert_eq!(err.status(), ncpy_transfer::STATUS_TRANSFER_FAILED);
        // The destination exists but holds no chunk.
        assert_eq!(std::fs::read(out_dir.path().join("stuck.bin")).unwrap(), b"");

        stop.store(true, Ordering::SeqCst);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn responder_gives_up_when_idle() {
        let src_dir = TempDir::new().unwrap();
        let source = write_source(&src_dir, "nobody.bin", b"waiting");

        let options = ResponderOptions {
            channel: ChannelOptions::with_timeout(Duration::from_millis(25)),
            idle_ceiling: 4,
            ..responder_options(4)
        };
        let responder = Responder::open(&source, &options).await.unwrap();
        let summary = responder.serve().await.unwrap();

        assert_eq!(summary.reason, ShutdownReason::Idle);
        assert_eq!(summary.chunks_served, 0);
    }

    #[tokio::test]
    async fn empty_source_binds_nothing() {
        let src_dir = TempDir::new().unwrap();
        let source = write_source(&src_dir, "empty.bin", b"");

        let err = Responder::open(&source, &responder_options(4))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), ncpy_transfer::STATUS_SOURCE_FAILED);
    }
}
