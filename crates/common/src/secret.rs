//! Secret wrapper for credentials held in session memory

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value (access token, code verifier, password).
///
/// Redacted in Debug/Display so it can sit inside structs that are logged
/// with `?`. The inner value is zeroized when the wrapper is dropped.
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Leading characters followed by `...`, for diagnostic logs only.
    ///
    /// Values no longer than `len` are fully redacted instead, so a short
    /// secret is never printed whole.
    pub fn preview(&self, len: usize) -> String {
        if self.0.chars().count() <= len {
            return "[REDACTED]".into();
        }
        let head: String = self.0.chars().take(len).collect();
        format!("{head}...")
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: Zeroize + PartialEq> PartialEq for Secret<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
