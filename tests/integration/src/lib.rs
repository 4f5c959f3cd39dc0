//! End-to-end tests for the ftp2s3 server.
//!
//! Most tests start an in-process server on an ephemeral port backed by
//! [`MemoryObjectStore`] and drive it over real TCP with [`FtpClient`].
//!
//! Tests against a live S3-compatible endpoint are marked `#[ignore]`. Run
//! them with:
//! ```text
//! S3_ENDPOINT_URL=http://localhost:4566 cargo test -p ftp2s3-integration -- --ignored
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Once};

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use ftp2s3_core::{Ftp2S3Config, StoreBackend};
use ftp2s3_ftp::{FtpResult, FtpServer};
use ftp2s3_s3::{MemoryObjectStore, ObjectStore, S3DriverFactory};

static INIT: Once = Once::new();

/// Login used by every test server.
pub const USERNAME: &str = "tester";
/// Password used by every test server.
pub const PASSWORD: &str = "t3st-pass";

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Configuration for an in-process test server.
#[must_use]
pub fn test_config() -> Ftp2S3Config {
    Ftp2S3Config::builder()
        .port(0)
        .ftp_username(USERNAME.into())
        .ftp_password(PASSWORD.into())
        .server_name("FTP2S3-TEST".into())
        .passive_port_low(48_000)
        .passive_port_high(48_999)
        .store_backend(StoreBackend::Memory)
        .max_upload_bytes(64 * 1024)
        .build()
}

/// A running server that stops when dropped or [`TestServer::stop`]ped.
#[derive(Debug)]
pub struct TestServer {
    /// Control address.
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<FtpResult<()>>>,
}

impl TestServer {
    /// Start a server over `store` with [`test_config`].
    pub async fn start(store: Arc<dyn ObjectStore>) -> Self {
        Self::start_with(store, test_config()).await
    }

    /// Start a server over `store` with an explicit configuration.
    pub async fn start_with(store: Arc<dyn ObjectStore>, config: Ftp2S3Config) -> Self {
        init_tracing();

        let factory = S3DriverFactory::from_config(store, &config);
        let server = FtpServer::bind(&config, Arc::new(factory))
            .await
            .expect("bind test server");
        let addr = server.local_addr().expect("local addr");
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(async {
            stopped.await.ok();
        }));

        Self {
            addr,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Start a server over a fresh memory store and return both.
    pub async fn with_memory_store() -> (Self, Arc<MemoryObjectStore>) {
        let store = Arc::new(MemoryObjectStore::new());
        (Self::start(store.clone()).await, store)
    }

    /// Connect a client and log in.
    pub async fn login(&self) -> FtpClient {
        let mut client = FtpClient::connect(self.addr).await;
        client.login(USERNAME, PASSWORD).await;
        client
    }

    /// Shut the server down and wait for its sessions to close.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            stop.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            handle.await.expect("join server").expect("serve");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.send(()).ok();
        }
    }
}

/// A deliberately small FTP client: passive mode only, one command at a time.
#[derive(Debug)]
pub struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// The greeting line sent by the server.
    pub greeting: String,
}

impl FtpClient {
    /// Connect and read the greeting.
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect control");
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
            greeting: String::new(),
        };
        let (code, text) = client.reply().await;
        assert_eq!(code, 220, "greeting: {text}");
        client.greeting = text;
        client
    }

    /// Read one (possibly multi-line) reply.
    pub async fn reply(&mut self) -> (u16, String) {
        let first = self.line().await;
        let code: u16 = first[..3].parse().expect("reply code");
        let mut text = first[4..].to_owned();

        if first.as_bytes()[3] == b'-' {
            let terminator = format!("{code} ");
            loop {
                let line = self.line().await;
                text.push('\n');
                if let Some(last) = line.strip_prefix(&terminator) {
                    text.push_str(last);
                    break;
                }
                text.push_str(line.trim_start());
            }
        }
        (code, text)
    }

    /// Send `line` and read the reply.
    pub async fn cmd(&mut self, line: &str) -> (u16, String) {
        self.send(line).await;
        self.reply().await
    }

    /// Log in, asserting success.
    pub async fn login(&mut self, user: &str, pass: &str) {
        assert_eq!(self.cmd(&format!("USER {user}")).await.0, 331);
        let (code, text) = self.cmd(&format!("PASS {pass}")).await;
        assert_eq!(code, 230, "login: {text}");
    }

    /// Enter passive mode and connect the data channel.
    pub async fn open_data(&mut self) -> TcpStream {
        let (code, text) = self.cmd("PASV").await;
        assert_eq!(code, 227, "PASV: {text}");
        TcpStream::connect(parse_pasv(&text))
            .await
            .expect("connect data")
    }

    /// `LIST`/`NLST` and return the lines, or the failure reply.
    pub async fn listing(
        &mut self,
        verb: &str,
        path: Option<&str>,
    ) -> Result<Vec<String>, (u16, String)> {
        let mut data = self.open_data().await;
        let command = match path {
            Some(path) => format!("{verb} {path}"),
            None => verb.to_owned(),
        };
        let (code, text) = self.cmd(&command).await;
        if code != 150 {
            return Err((code, text));
        }

        let mut body = String::new();
        data.read_to_string(&mut body).await.expect("read listing");
        let done = self.reply().await;
        assert_eq!(done.0, 226, "listing end: {}", done.1);
        Ok(body.lines().map(ToOwned::to_owned).collect())
    }

    /// `NLST` names only.
    pub async fn names(&mut self, path: Option<&str>) -> Vec<String> {
        self.listing("NLST", path).await.expect("NLST")
    }

    /// Download `path`, or return the failure reply.
    pub async fn retr(&mut self, path: &str) -> Result<Vec<u8>, (u16, String)> {
        let mut data = self.open_data().await;
        let (code, text) = self.cmd(&format!("RETR {path}")).await;
        if code != 150 {
            return Err((code, text));
        }

        let mut body = Vec::new();
        data.read_to_end(&mut body).await.expect("read file");
        match self.reply().await {
            (226, _) => Ok(body),
            failure => Err(failure),
        }
    }

    /// Upload `body` to `path` and return the final reply.
    pub async fn stor(&mut self, path: &str, body: &[u8]) -> (u16, String) {
        let mut data = self.open_data().await;
        let (code, text) = self.cmd(&format!("STOR {path}")).await;
        if code != 150 {
            return (code, text);
        }

        // The server may hang up early on refused uploads.
        if data.write_all(body).await.is_ok() {
            data.shutdown().await.ok();
        }
        drop(data);
        self.reply().await
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("send command");
    }

    async fn line(&mut self) -> String {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await.expect("read reply");
        assert!(read > 0, "server closed the control connection");
        line.trim_end_matches(['\r', '\n']).to_owned()
    }
}

/// Parse the address out of a `227` reply text.
#[must_use]
pub fn parse_pasv(text: &str) -> SocketAddr {
    let start = text.find('(').expect("open paren") + 1;
    let end = text.rfind(')').expect("close paren");
    let parts: Vec<u8> = text[start..end]
        .split(',')
        .map(|p| p.trim().parse().expect("octet"))
        .collect();
    assert_eq!(parts.len(), 6, "PASV tuple: {text}");
    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = (u16::from(parts[4]) << 8) | u16::from(parts[5]);
    SocketAddr::from((ip, port))
}

/// Endpoint URL for the live S3-compatible store.
fn endpoint_url() -> String {
    std::env::var("S3_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Create a configured S3 client pointing at the live endpoint.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// Server configuration pointing at the live endpoint and `bucket`.
#[must_use]
pub fn live_config(bucket: &str) -> Ftp2S3Config {
    Ftp2S3Config::builder()
        .aws_bucket_name(bucket.to_owned())
        .aws_access_key_id("test".into())
        .aws_secret_access_key("test".into())
        .aws_endpoint_url(Some(endpoint_url()))
        .store_timeout_secs(10)
        .build()
}

/// Create a uniquely named bucket. Caller is responsible for cleanup.
pub async fn create_test_bucket(client: &aws_sdk_s3::Client, prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    let name = format!("ftp2s3-{prefix}-{id}");
    client
        .create_bucket()
        .bucket(&name)
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create bucket {name}: {e}"));
    name
}

/// Delete all objects in a bucket, then delete the bucket.
pub async fn cleanup_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    let mut continuation_token = None;
    loop {
        let mut req = client.list_objects_v2().bucket(bucket);
        if let Some(token) = continuation_token.take() {
            req = req.continuation_token(token);
        }
        let Ok(resp) = req.send().await else {
            return; // Bucket may not exist.
        };

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
        } else {
            break;
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

mod test_listing;
mod test_live_s3;
mod test_transfer;
