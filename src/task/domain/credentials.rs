//! Scoped source-host credential.

use super::TaskDomainError;
use std::fmt;

/// Opaque handle to a scoped authorization token.
///
/// The token is never rendered by `Debug` and the type has no
/// `Display` or `Serialize` implementation. Adapters read it through
/// [`Credentials::expose`] at the point of use.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    /// Wraps a token.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyCredentials`] when the token is empty
    /// after trimming.
    pub fn new(token: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = token.into();
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(TaskDomainError::EmptyCredentials);
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the raw token for use in an outbound request or worker
    /// environment.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credentials([redacted])")
    }
}
