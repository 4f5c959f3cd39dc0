//! Core types, configuration, and the driver contract for ftp2s3.
//!
//! This crate holds everything the FTP engine and the object-store driver
//! agree on: the [`FileSystemDriver`] trait, listing entries, the error model,
//! path resolution, and process configuration.

mod config;
pub mod driver;
mod error;
pub mod path;
mod types;

pub use config::{DEFAULT_MAX_UPLOAD_BYTES, Ftp2S3Config, StoreBackend};
pub use driver::{ByteReader, DirEntry, DriverFactory, FileSystemDriver, UploadSource};
pub use error::{DriverError, DriverResult, ErrorKind, Ftp2S3Error, Ftp2S3Result};
pub use types::Credentials;
