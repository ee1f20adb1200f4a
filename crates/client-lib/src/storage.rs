// ============================
// crates/client-lib/src/storage.rs
// ============================
//! Persisted client storage: a string-valued key-value store.
//!
//! The keys in [`keys`] are the durable-state contract of the client. There is
//! no versioning; a value that no longer parses is treated as absent by its
//! reader.
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::ClientError;

/// Fixed storage keys
pub mod keys {
    /// Current session as JSON `{id, nombre, email}`
    pub const SESSION: &str = "userData";
    /// Epoch milliseconds of the failure that armed the cooldown
    pub const LAST_FAILURE: &str = "lastAttempt";
    /// Last chosen form mode, `login` or `register`
    pub const AUTH_MODE: &str = "authMode";
    /// User held by the identity-provider backend
    pub const IDENTITY_USER: &str = "identityUser";
    /// Cookies set by the session-cookie backend, JSON map of cookie name to
    /// `{url, header}`
    pub const COOKIES: &str = "sessionCookies";
}

const STORAGE_FILE: &str = "storage.json";

/// Trait for client storage backends
pub trait ClientStorage: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

impl dyn ClientStorage {
    /// Read and decode a JSON value. Undecodable values are reported as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ClientError> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable stored value");
                Ok(None)
            },
        }
    }

    /// Encode `value` as JSON and store it
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ClientError> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

/// In-memory implementation, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Flat-file implementation: one JSON object written through on every
/// mutation. A mutation only becomes visible once it is on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) the store under `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, ClientError> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let path = root.join(STORAGE_FILE);

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}
