//! Control-channel replies.

use std::fmt;

use ftp2s3_core::{DriverError, ErrorKind};

/// A numbered FTP reply, possibly spanning several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
}

impl Reply {
    /// Single-line reply.
    #[must_use]
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    /// Multi-line reply. The first and last lines carry the code; lines in
    /// between are indented by one space.
    #[must_use]
    pub fn multi(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Reply code.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Reply for a failed driver operation.
    #[must_use]
    pub fn from_driver_error(err: &DriverError) -> Self {
        if let DriverError::EntityTooLarge { limit, .. } = err {
            return Self::new(552, format!("File exceeds the upload limit of {limit} bytes"));
        }
        match err.kind() {
            ErrorKind::NotFound => Self::new(550, "No such file or directory"),
            ErrorKind::AccessDenied => Self::new(550, "Permission denied"),
            ErrorKind::Rejected => Self::new(550, "Requested action not taken"),
            ErrorKind::Transient => {
                Self::new(451, "Requested action aborted: storage temporarily unavailable")
            }
            ErrorKind::Unsupported => {
                Self::new(550, "Operation not supported on this filesystem")
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lines.as_slice() {
            [] => write!(f, "{} \r\n", self.code),
            [only] => write!(f, "{} {only}\r\n", self.code),
            [first, middle @ .., last] => {
                write!(f, "{}-{first}\r\n", self.code)?;
                for line in middle {
                    write!(f, " {line}\r\n")?;
                }
                write!(f, "{} {last}\r\n", self.code)
            }
        }
    }
}
