//! Shared distributed store capability.
//!
//! Every node in the cluster can read what the launcher writes here. The
//! launcher only consumes the store through [`SharedStore`]; concrete
//! backends live outside this crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

use crate::types::Token;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("path already exists: {0}")]
    AlreadyExists(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("delegation token error: {0}")]
    Token(String),
}

impl StoreError {
    pub fn io(path: impl fmt::Display, source: std::io::Error) -> Self {
        StoreError::Io { path: path.to_string(), source }
    }
}

/// A location in the shared store: either an absolute path (`/apps/x`) or a
/// fully-qualified URI (`scheme://authority/apps/x`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorePath(String);

impl StorePath {
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        while path.len() > 1 && path.ends_with('/') && !path.ends_with("://") {
            path.pop();
        }
        StorePath(path)
    }

    /// Append a child segment.
    pub fn join(&self, child: &str) -> StorePath {
        let child = child.trim_start_matches('/');
        if self.0.ends_with('/') {
            StorePath::new(format!("{}{child}", self.0))
        } else {
            StorePath::new(format!("{}/{child}", self.0))
        }
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        self.path().rsplit('/').next().unwrap_or_default()
    }

    /// The path component with any `scheme://authority` prefix removed.
    pub fn path(&self) -> &str {
        match self.0.split_once("://") {
            Some((_, rest)) => match rest.find('/') {
                Some(idx) => &rest[idx..],
                None => "/",
            },
            None => &self.0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorePath {
    fn from(path: &str) -> Self {
        StorePath::new(path)
    }
}

impl From<String> for StorePath {
    fn from(path: String) -> Self {
        StorePath::new(path)
    }
}

/// Metadata for one store entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: StorePath,
    pub len: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub modification_time: u64,
    pub is_dir: bool,
}

/// Capability surface of the shared distributed store.
///
/// Implementations are used from a single thread; one launch owns the
/// handle for its whole lifetime.
pub trait SharedStore {
    /// URI of the store root, used as the token service name.
    fn uri(&self) -> String;

    /// Copy a file or directory from the local filesystem into the store.
    fn copy_local_to_store(&self, src: &Path, dst: &StorePath, overwrite: bool) -> StoreResult<()>;

    /// Copy a file or directory tree within the store.
    fn copy_store_to_store(
        &self,
        src: &StorePath,
        dst: &StorePath,
        overwrite: bool,
    ) -> StoreResult<()>;

    fn list_children(&self, dir: &StorePath) -> StoreResult<Vec<FileStatus>>;

    /// Delete a path. Returns true if something was removed.
    fn delete(&self, path: &StorePath, recursive: bool) -> StoreResult<bool>;

    fn open_for_read(&self, path: &StorePath) -> StoreResult<Box<dyn Read>>;

    /// Create a file (and missing parents) for writing.
    fn create_for_write(&self, path: &StorePath, overwrite: bool) -> StoreResult<Box<dyn Write>>;

    fn get_status(&self, path: &StorePath) -> StoreResult<FileStatus>;

    /// Move `from` to `to`, replacing a file already at `to` in one step.
    fn rename(&self, from: &StorePath, to: &StorePath) -> StoreResult<()>;

    fn mkdirs(&self, path: &StorePath) -> StoreResult<()>;

    fn exists(&self, path: &StorePath) -> StoreResult<bool> {
        match self.get_status(path) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delegation tokens for this store, renewable by `renewer`.
    ///
    /// Stores without security return an empty list.
    fn delegation_tokens(&self, _renewer: &str) -> StoreResult<Vec<Token>> {
        Ok(Vec::new())
    }
}
