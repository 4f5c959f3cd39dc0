//! Command-line flags, each with an environment variable fallback.
//!
//! A flag wins over its variable; when neither is given the
//! [`Ftp2S3Config`] default applies.

use clap::{ArgAction, Parser};

use ftp2s3_core::{Ftp2S3Config, StoreBackend};

#[derive(Debug, Parser)]
#[command(author, version, about = "FTP server that stores files in an S3 bucket")]
pub(crate) struct Cli {
    /// Host the control listener binds to [default: 127.0.0.1].
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Control port [default: 2121].
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// FTP login name [default: ftp2s3].
    #[arg(long, env = "FTP_USERNAME")]
    ftp_username: Option<String>,

    /// FTP password [default: ftp2s3].
    #[arg(long, env = "FTP_PASSWORD", hide_env_values = true)]
    ftp_password: Option<String>,

    /// Name announced in the greeting [default: FTP2S3].
    #[arg(long, env = "FTP_SERVER_NAME")]
    ftp_server_name: Option<String>,

    /// Region of the bucket [default: us-east-1].
    #[arg(long, env = "AWS_REGION")]
    aws_region: Option<String>,

    /// Static access key; the SDK default provider chain is used when empty.
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    aws_access_key_id: Option<String>,

    /// Static secret key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: Option<String>,

    /// Bucket every session operates in (required for the s3 backend).
    #[arg(long, env = "AWS_BUCKET_NAME")]
    aws_bucket_name: Option<String>,

    /// Endpoint override for S3-compatible stores.
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    aws_endpoint_url: Option<String>,

    /// Lowest passive data port [default: 42000].
    #[arg(long, env = "PASSIVE_PORT_LOW")]
    passive_port_low: Option<u16>,

    /// Highest passive data port [default: 45000].
    #[arg(long, env = "PASSIVE_PORT_HIGH")]
    passive_port_high: Option<u16>,

    /// Address advertised in PASV replies; the control connection's local
    /// address when unset.
    #[arg(long, env = "PASSIVE_ADDRESS")]
    passive_address: Option<String>,

    /// Largest accepted upload in bytes [default: 5 GiB].
    #[arg(long, env = "MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<u64>,

    /// Deadline for each store call, in seconds [default: 60].
    #[arg(long, env = "STORE_TIMEOUT_SECS")]
    store_timeout_secs: Option<u64>,

    /// Object store implementation: `s3` or `memory` [default: s3].
    #[arg(long, env = "STORE_BACKEND")]
    store_backend: Option<StoreBackend>,

    /// Log filter used when `RUST_LOG` is unset [default: info].
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Check that a local server answers with a greeting, then exit.
    #[arg(long, action = ArgAction::SetTrue)]
    pub(crate) health_check: bool,
}

impl Cli {
    /// Overlay the given flags on the default configuration.
    pub(crate) fn config(&self) -> Ftp2S3Config {
        let mut config = Ftp2S3Config::default();

        if let Some(v) = &self.host {
            config.host.clone_from(v);
        }
        if let Some(n) = self.port {
            config.port = n;
        }
        if let Some(v) = &self.ftp_username {
            config.ftp_username.clone_from(v);
        }
        if let Some(v) = &self.ftp_password {
            config.ftp_password.clone_from(v);
        }
        if let Some(v) = &self.ftp_server_name {
            config.server_name.clone_from(v);
        }
        if let Some(v) = &self.aws_region {
            config.aws_region.clone_from(v);
        }
        if let Some(v) = &self.aws_access_key_id {
            config.aws_access_key_id.clone_from(v);
        }
        if let Some(v) = &self.aws_secret_access_key {
            config.aws_secret_access_key.clone_from(v);
        }
        if let Some(v) = &self.aws_bucket_name {
            config.aws_bucket_name.clone_from(v);
        }
        if let Some(v) = self.aws_endpoint_url.as_ref().filter(|v| !v.is_empty()) {
            config.aws_endpoint_url = Some(v.clone());
        }
        if let Some(n) = self.passive_port_low {
            config.passive_port_low = n;
        }
        if let Some(n) = self.passive_port_high {
            config.passive_port_high = n;
        }
        if let Some(v) = self.passive_address.as_ref().filter(|v| !v.is_empty()) {
            config.passive_address = Some(v.clone());
        }
        if let Some(n) = self.max_upload_bytes {
            config.max_upload_bytes = n;
        }
        if let Some(n) = self.store_timeout_secs {
            config.store_timeout_secs = n;
        }
        if let Some(b) = self.store_backend {
            config.store_backend = b;
        }
        if let Some(v) = &self.log_level {
            config.log_level.clone_from(v);
        }

        config
    }
}
