//! Error types for ftp2s3.
//!
//! [`Ftp2S3Error`] covers startup configuration.
//! [`DriverError`] is what every [`crate::FileSystemDriver`] operation returns
//! on failure. Each variant maps to an [`ErrorKind`]; the protocol engine only
//! ever branches on the kind, so "object not found" and "store unreachable"
//! stay distinguishable without widening the driver contract.

use std::fmt;

/// Core error type for process-level failures.
#[derive(Debug, thiserror::Error)]
pub enum Ftp2S3Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for process-level operations.
pub type Ftp2S3Result<T> = Result<T, Ftp2S3Error>;

/// Coarse classification of a driver failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The key (or any key under a prefix) does not exist.
    NotFound,
    /// The store refused the credentials or the bucket policy denies access.
    AccessDenied,
    /// The store answered, but rejected the request for another reason.
    Rejected,
    /// The request never completed a round trip: network, timeout, bad response.
    Transient,
    /// The operation has no meaning on a flat object store.
    Unsupported,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::AccessDenied => "access denied",
            Self::Rejected => "rejected",
            Self::Transient => "transient",
            Self::Unsupported => "unsupported",
        })
    }
}

/// Failure of a filesystem driver operation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The specified key does not exist.
    #[error("no such object: {key}")]
    NotFound {
        /// The key or prefix that was looked up.
        key: String,
    },

    /// Access to the key was denied.
    #[error("access denied: {key}")]
    AccessDenied {
        /// The key or prefix that was accessed.
        key: String,
    },

    /// The store returned an error response other than not-found/denied.
    #[error("object store rejected {operation} on {key:?}: {message}")]
    Rejected {
        /// Store primitive that failed.
        operation: &'static str,
        /// The key or prefix involved.
        key: String,
        /// Service error code and message.
        message: String,
    },

    /// The store call did not complete.
    #[error("{operation} on {key:?} did not complete: {message}")]
    Transient {
        /// Store primitive that failed.
        operation: &'static str,
        /// The key or prefix involved.
        key: String,
        /// Transport-level description.
        message: String,
    },

    /// A paginated listing cannot be continued.
    #[error("listing of {prefix:?} was truncated without a continuation marker")]
    IncompleteListing {
        /// The prefix being listed.
        prefix: String,
    },

    /// The upload exceeds the configured size limit.
    #[error("upload to {key} exceeds the {limit} byte limit")]
    EntityTooLarge {
        /// Destination key.
        key: String,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The operation cannot be expressed on an object store.
    #[error("{operation} is not supported by the object store")]
    Unsupported {
        /// Driver operation name.
        operation: &'static str,
    },

    /// Reading the client's upload stream failed.
    #[error("failed to read upload stream: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Classify this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftp2s3_core::{DriverError, ErrorKind};
    ///
    /// let err = DriverError::Unsupported { operation: "rename" };
    /// assert_eq!(err.kind(), ErrorKind::Unsupported);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::Rejected { .. }
            | Self::IncompleteListing { .. }
            | Self::EntityTooLarge { .. } => ErrorKind::Rejected,
            Self::Transient { .. } | Self::Io(_) => ErrorKind::Transient,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }
}

/// Result type of every driver operation.
pub type DriverResult<T> = Result<T, DriverError>;
