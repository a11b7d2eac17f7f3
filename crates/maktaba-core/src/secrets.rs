//! Secret values — the completion-service API key and user passwords.
//!
//! [`SecretValue`] keeps a string out of `Debug` output and zeroizes it on
//! drop. The API key is read exactly once at startup with [`load_env_secret`];
//! a missing or blank variable is a startup error, never a first-request one.

use std::fmt;

use zeroize::Zeroize;

/// A secret string with automatic zeroization.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue {
    inner: String,
}

impl SecretValue {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Get the secret value as a string slice.
    ///
    /// Use sparingly — only at the point the value leaves the process
    /// (an `Authorization` header, a stored password column).
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Get the secret value length (without exposing the value).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the secret value is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("inner", &"[REDACTED]")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Drop for SecretValue {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

/// Errors from loading secrets.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("environment variable '{0}' not set")]
    EnvNotSet(String),

    #[error("secret value is empty for '{0}'")]
    EmptyValue(String),
}

/// Load a secret from the process environment.
pub fn load_env_secret(var: &str) -> Result<SecretValue, SecretError> {
    load_secret_with(var, |name| std::env::var(name).ok())
}

/// Load a secret through an arbitrary lookup function.
///
/// Surrounding whitespace is stripped; a value that is empty afterwards is
/// rejected.
pub fn load_secret_with<F>(var: &str, lookup: F) -> Result<SecretValue, SecretError>
where
    F: FnOnce(&str) -> Option<String>,
{
    let mut raw = lookup(var).ok_or_else(|| SecretError::EnvNotSet(var.to_string()))?;
    let value = SecretValue::new(raw.trim());
    raw.zeroize();

    if value.is_empty() {
        return Err(SecretError::EmptyValue(var.to_string()));
    }
    Ok(value)
}
