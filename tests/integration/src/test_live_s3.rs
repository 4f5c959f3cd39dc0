//! FTP sessions against a live S3-compatible endpoint.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aws_sdk_s3::primitives::ByteStream;
    use bytes::Bytes;
    use ftp2s3_s3::{BucketRef, S3ObjectStore};

    use crate::{
        TestServer, cleanup_bucket, create_test_bucket, live_config, s3_client, test_config,
    };

    async fn start(bucket: &str) -> TestServer {
        let mut config = live_config(bucket);
        let base = test_config();
        config.port = 0;
        config.ftp_username = base.ftp_username;
        config.ftp_password = base.ftp_password;
        config.passive_port_low = base.passive_port_low;
        config.passive_port_high = base.passive_port_high;

        let store = S3ObjectStore::connect(BucketRef::from_config(&config)).await;
        TestServer::start_with(Arc::new(store), config).await
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_upload_through_ftp_and_read_through_sdk() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "upload").await;
        let server = start(&bucket).await;
        let mut ftp = server.login().await;

        assert_eq!(ftp.stor("/notes/today.txt", b"hello s3").await.0, 226);

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key("notes/today.txt")
            .send()
            .await
            .expect("get_object");
        assert_eq!(resp.content_type(), Some("text/plain"));
        let data = resp
            .body
            .collect()
            .await
            .expect("collect body")
            .into_bytes();
        assert_eq!(data.as_ref(), b"hello s3");

        server.stop().await;
        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_list_and_download_sdk_objects() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "list").await;
        for (key, body) in [("a/b.txt", "0123456789"), ("a/c/d.txt", "01234")] {
            client
                .put_object()
                .bucket(&bucket)
                .key(key)
                .body(ByteStream::from(Bytes::from_static(body.as_bytes())))
                .send()
                .await
                .expect("put_object");
        }

        let server = start(&bucket).await;
        let mut ftp = server.login().await;

        assert_eq!(ftp.names(Some("/a")).await, ["b.txt", "c"]);
        assert_eq!(ftp.cmd("CWD /a/c").await.0, 250);
        assert_eq!(ftp.retr("d.txt").await.expect("RETR"), b"01234");
        assert_eq!(ftp.cmd("SIZE /a/b.txt").await, (213, "10".into()));
        assert_eq!(ftp.cmd("DELE /a/b.txt").await.0, 250);
        assert_eq!(ftp.cmd("SIZE /a/b.txt").await.0, 550);

        server.stop().await;
        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running S3 endpoint"]
    async fn test_should_report_missing_bucket_without_crashing() {
        let server = start("ftp2s3-bucket-that-does-not-exist").await;
        let mut ftp = server.login().await;

        let err = ftp.listing("LIST", None).await.expect_err("no bucket");
        assert_eq!(err.0, 550);
        assert_eq!(ftp.cmd("NOOP").await.0, 200);
        server.stop().await;
    }
}
