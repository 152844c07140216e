//! Client-local key/value persistence.
//!
//! DESIGN
//! ======
//! Only two string keys are ever stored: the anonymous client id and the
//! bearer token. `FileStore` keeps them in one small JSON object on disk and
//! rewrites the whole file on every mutation. A context with no persistent
//! storage is represented by `None` at the call site, not by a store that
//! silently drops writes.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::ApiError;

pub const CLIENT_ID_KEY: &str = "url-shortener-client-id";
pub const TOKEN_KEY: &str = "token";

/// Shared handle to a storage backend; `None` means no persistent context.
pub type SharedStore = Option<Arc<dyn KeyValueStore>>;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the removal cannot be persisted.
    fn remove(&self, key: &str) -> Result<(), ApiError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) a JSON storage file.
    ///
    /// A missing file is an empty store; the file and its parent directories
    /// are only created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Storage`] if the file exists but cannot be read or
    /// is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| ApiError::Storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ApiError::Storage(format!("{}: {e}", path.display()))),
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), ApiError> {
        let storage_err = |e: std::io::Error| ApiError::Storage(format!("{}: {e}", self.path.display()));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                private_dir_builder().create(parent).map_err(storage_err)?;
            }
        }
        let text = serde_json::to_string_pretty(entries).map_err(|e| ApiError::Storage(e.to_string()))?;

        let mut file = private_file_options().open(&self.path).map_err(storage_err)?;
        // mode() only applies on create
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(storage_err)?;
        }
        file.write_all(text.as_bytes()).map_err(storage_err)
    }

    /// Apply `mutate` to a copy of the entries and commit it only once the
    /// copy is on disk.
    fn update(&self, mutate: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<(), ApiError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = entries.clone();
        if !mutate(&mut next) {
            return Ok(());
        }
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

/// The file holds the bearer token: owner-only on unix.
fn private_file_options() -> std::fs::OpenOptions {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

fn private_dir_builder() -> std::fs::DirBuilder {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ApiError> {
        self.update(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), ApiError> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
