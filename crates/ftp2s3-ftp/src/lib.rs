//! FTP protocol engine for ftp2s3.
//!
//! Speaks the control protocol (RFC 959 plus `SIZE`, `MDTM`, `REST`, `EPSV`)
//! and delegates every filesystem operation to a
//! [`ftp2s3_core::FileSystemDriver`] obtained per connection from a
//! [`ftp2s3_core::DriverFactory`]. Only passive data connections are offered.

pub mod command;
mod error;
pub mod format;
pub mod passive;
pub mod reply;
mod server;
mod session;

pub use command::Command;
pub use error::{FtpError, FtpResult};
pub use passive::PassivePorts;
pub use reply::Reply;
pub use server::FtpServer;
