//! Engine-level errors.
//!
//! Failures of individual driver operations never reach this type: they are
//! answered on the control connection and the session continues. [`FtpError`]
//! covers what ends a session or stops the server.

use std::io;

/// Error that ends a session or prevents the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum FtpError {
    /// The control listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// `PASSIVE_ADDRESS` is not an IP address.
    #[error("invalid passive address: {0:?}")]
    InvalidPassiveAddress(String),

    /// I/O on the control connection failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type for engine operations.
pub type FtpResult<T> = Result<T, FtpError>;
