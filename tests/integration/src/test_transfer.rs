//! Uploads, downloads, metadata and deletes over real data connections.

#[cfg(test)]
mod tests {
    use ftp2s3_core::ErrorKind;
    use ftp2s3_s3::StoreOp;

    use crate::{TestServer, test_config};

    #[tokio::test]
    async fn test_should_round_trip_file() {
        let (server, store) = TestServer::with_memory_store().await;
        let mut client = server.login().await;

        let body = b"The quick brown fox jumps over the lazy dog";
        assert_eq!(client.stor("/docs/fox.txt", body).await.0, 226);
        assert_eq!(store.body("docs/fox.txt").as_deref(), Some(&body[..]));

        let downloaded = client.retr("/docs/fox.txt").await.expect("RETR");
        assert_eq!(downloaded, body);
    }

    #[tokio::test]
    async fn test_should_report_size_after_upload() {
        let (server, _store) = TestServer::with_memory_store().await;
        let mut client = server.login().await;

        let body = vec![0xAB_u8; 4096];
        assert_eq!(client.stor("blob.bin", &body).await.0, 226);
        assert_eq!(client.cmd("SIZE blob.bin").await, (213, "4096".into()));
    }

    #[tokio::test]
    async fn test_should_infer_content_type_from_extension() {
        let (server, store) = TestServer::with_memory_store().await;
        let mut client = server.login().await;

        assert_eq!(client.stor("/x.txt", b"hello").await.0, 226);
        assert_eq!(client.stor("/y.unknownext", b"hello").await.0, 226);
        assert_eq!(store.content_type("x.txt").as_deref(), Some("text/plain"));
        assert_eq!(
            store.content_type("y.unknownext").as_deref(),
            Some("application/octet-stream")
        );
    }

    #[tokio::test]
    async fn test_should_resolve_uploads_against_working_directory() {
        let (server, store) = TestServer::with_memory_store().await;
        store.insert("inbox/.keep", "");
        let mut client = server.login().await;

        assert_eq!(client.cmd("CWD inbox").await.0, 250);
        assert_eq!(client.stor("report.csv", b"a,b\n1,2\n").await.0, 226);
        assert!(store.keys().contains(&"inbox/report.csv".to_owned()));
        assert_eq!(store.content_type("inbox/report.csv").as_deref(), Some("text/csv"));
    }

    #[tokio::test]
    async fn test_should_report_modification_time() {
        let (server, store) = TestServer::with_memory_store().await;
        store.insert("a.txt", "x");
        let mut client = server.login().await;

        let (code, text) = client.cmd("MDTM a.txt").await;
        assert_eq!(code, 213);
        assert_eq!(text.len(), 14);
        assert!(text.chars().all(|c| c.is_ascii_digit()), "{text}");
        assert_eq!(client.cmd("MDTM missing.txt").await.0, 550);
    }

    #[tokio::test]
    async fn test_should_fail_missing_download_before_opening_transfer() {
        let (server, _store) = TestServer::with_memory_store().await;
        let mut client = server.login().await;

        let err = client.retr("/nope.bin").await.expect_err("missing");
        assert_eq!(err.0, 550);
        assert_eq!(client.cmd("SIZE /nope.bin").await.0, 550);
    }

    #[tokio::test]
    async fn test_should_answer_transport_failure_and_keep_session() {
        let (server, store) = TestServer::with_memory_store().await;
        store.inject_fault(StoreOp::Get, "missing-network.bin", ErrorKind::Transient);
        let mut client = server.login().await;

        let err = client.retr("/missing-network.bin").await.expect_err("transient");
        assert_eq!(err.0, 451);
        assert_eq!(client.cmd("NOOP").await.0, 200);
    }

    #[tokio::test]
    async fn test_should_ignore_rest_offset_on_download() {
        let (server, store) = TestServer::with_memory_store().await;
        store.insert("digits.txt", "0123456789");
        let mut client = server.login().await;

        assert_eq!(client.cmd("REST 5").await.0, 350);
        let body = client.retr("digits.txt").await.expect("RETR");
        assert_eq!(body, b"0123456789");
        assert_eq!(client.cmd("REST x").await.0, 501);
    }

    #[tokio::test]
    async fn test_should_delete_existing_file_only() {
        let (server, store) = TestServer::with_memory_store().await;
        store.insert("old/log.txt", "x");
        let mut client = server.login().await;

        assert_eq!(client.cmd("DELE /old/log.txt").await.0, 250);
        assert!(store.keys().is_empty());
        assert_eq!(client.cmd("DELE /old/log.txt").await.0, 550);
        assert_eq!(store.call_count(StoreOp::Delete), 1);
    }

    #[tokio::test]
    async fn test_should_refuse_upload_over_limit() {
        let store = std::sync::Arc::new(ftp2s3_s3::MemoryObjectStore::new());
        let config = test_config();
        let limit = usize::try_from(config.max_upload_bytes).expect("limit fits");
        let server = TestServer::start_with(store.clone(), config).await;
        let mut client = server.login().await;

        let body = vec![1_u8; limit + 1];
        assert_eq!(client.stor("/big.bin", &body).await.0, 552);
        assert!(store.keys().is_empty());
        assert_eq!(client.cmd("NOOP").await.0, 200);
    }

    #[tokio::test]
    async fn test_should_answer_failed_upload_with_451() {
        let (server, store) = TestServer::with_memory_store().await;
        store.inject_fault(StoreOp::Put, "flaky.bin", ErrorKind::Transient);
        let mut client = server.login().await;

        assert_eq!(client.stor("/flaky.bin", b"data").await.0, 451);
        assert!(store.body("flaky.bin").is_none());
    }
}
