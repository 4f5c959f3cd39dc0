//! Object-store filesystem driver for ftp2s3.
//!
//! Presents a single bucket as a hierarchical filesystem to the FTP engine:
//!
//! - [`store`] defines the five object-store primitives and their S3 and
//!   in-memory implementations.
//! - [`listing`] synthesizes directories from flat, paginated key listings.
//! - [`transfer`] moves whole objects in and out.
//! - [`auth`] checks the single configured login.
//! - [`driver`] ties them together behind [`ftp2s3_core::FileSystemDriver`].

pub mod auth;
pub mod driver;
pub mod listing;
pub mod store;
pub mod transfer;

pub use auth::Authenticator;
pub use driver::{S3Driver, S3DriverFactory};
pub use listing::DirectoryLister;
pub use store::{BucketRef, MemoryObjectStore, ObjectStore, S3ObjectStore, StoreOp};
pub use transfer::{FileTransferAdapter, content_type_for};
