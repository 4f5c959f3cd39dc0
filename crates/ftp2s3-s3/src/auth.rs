//! Login check against the single configured account.

use std::sync::Arc;

use subtle::ConstantTimeEq;

use ftp2s3_core::Credentials;

/// Accepts exactly one username/password pair.
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: Arc<Credentials>,
}

impl Authenticator {
    /// Create an authenticator for `credentials`.
    #[must_use]
    pub fn new(credentials: Arc<Credentials>) -> Self {
        Self { credentials }
    }

    /// Whether both fields match exactly (case-sensitive).
    ///
    /// Both comparisons always run so the result does not reveal which field
    /// was wrong.
    #[must_use]
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        let user_ok = username
            .as_bytes()
            .ct_eq(self.credentials.username().as_bytes());
        let pass_ok = password
            .as_bytes()
            .ct_eq(self.credentials.password().as_bytes());
        (user_ok & pass_ok).into()
    }
}
