//! Host seams: tab-scoped storage and browser navigation
//!
//! The session never talks to a browser directly. A host (the demo server,
//! a WASM shell, a test) provides these two traits. In-memory versions live
//! here because both the demo host and the tests use them.

use std::collections::HashMap;
use std::sync::Mutex;

use url::Url;

use crate::error::{Error, Result};

/// Volatile key/value storage scoped to one tab (never shared, never durable).
pub trait VerifierStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// Browser location control.
pub trait Navigator: Send + Sync {
    /// The URL the page was loaded with.
    fn current_url(&self) -> Url;

    /// Leave the page for `url`. Terminal for the calling operation.
    fn navigate(&self, url: &Url) -> Result<()>;

    /// Rewrite the visible URL without navigating (history replace).
    fn replace_url(&self, url: &Url);
}

/// `sessionStorage` equivalent.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VerifierStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

/// Navigator that records where the page was sent instead of leaving it.
///
/// `take_navigation` hands the pending target to the host, which performs the
/// actual redirect (an HTTP 303 in the demo server).
#[derive(Debug)]
pub struct MemoryNavigator {
    location: Mutex<Url>,
    pending: Mutex<Option<Url>>,
}

impl MemoryNavigator {
    pub fn new(location: Url) -> Self {
        Self {
            location: Mutex::new(location),
            pending: Mutex::new(None),
        }
    }

    /// Simulate the browser arriving at `url` (e.g. the redirect back).
    pub fn load(&self, url: Url) {
        *self.location.lock().unwrap_or_else(|e| e.into_inner()) = url;
    }

    /// Take the most recent navigation target, if any.
    pub fn take_navigation(&self) -> Option<Url> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> Url {
        self.location
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn navigate(&self, url: &Url) -> Result<()> {
        match url.scheme() {
            "http" | "https" => {
                *self.pending.lock().unwrap_or_else(|e| e.into_inner()) = Some(url.clone());
                Ok(())
            }
            other => Err(Error::Navigation(format!(
                "refusing to navigate to {other}: URL"
            ))),
        }
    }

    fn replace_url(&self, url: &Url) {
        self.load(url.clone());
    }
}
