//! Session-scoped key/value storage.
//!
//! Lives as long as the console process. With a backing file every mutation
//! is mirrored to disk as JSON so consecutive CLI invocations see the same
//! logged-in user. Entries never expire; they are only set, read and cleared.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::{ConsoleError, Result};

/// Key under which the current username is stored.
pub const LOGGED_IN_USER_KEY: &str = "loggedInUser";

#[derive(Clone, Default)]
pub struct SessionStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    backing: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store mirrored to `path`, loading existing entries if the file
    /// is present.
    ///
    /// # Errors
    /// `ConsoleError::Decode` when the file exists but is not a JSON object
    /// of strings.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(src) if src.trim().is_empty() => HashMap::new(),
            Ok(src) => serde_json::from_str(&src)
                .map_err(|e| ConsoleError::decode(path.display().to_string(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            entries: Arc::new(Mutex::new(entries)),
            backing: Some(path),
        })
    }

    pub fn backing_file(&self) -> Option<&Path> {
        self.backing.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }

    pub fn set_logged_in_user(&self, username: &str) {
        self.set(LOGGED_IN_USER_KEY, username);
    }

    pub fn logged_in_user(&self) -> Option<String> {
        self.get(LOGGED_IN_USER_KEY)
    }

    pub fn clear_logged_in_user(&self) {
        self.remove(LOGGED_IN_USER_KEY);
    }

    // A failed write leaves the in-memory value authoritative.
    fn persist(&self, entries: &HashMap<String, String>) {
        let Some(path) = &self.backing else { return };
        let result = serde_json::to_string_pretty(entries)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(path, json));
        if let Err(e) = result {
            warn!(error = %e, path = %path.display(), "failed to persist session");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
