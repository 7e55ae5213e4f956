//! Persisted recovery state of one application.
//!
//! Layout under `<app path>/recovery/`:
//!
//! - `snapshot`: latest [`CheckpointSnapshot`] as JSON
//! - `log`: append-only journal since that snapshot
//! - `log0`: the journal before the last rotation

use std::io::{Read, Write};

use liftoff_core::{ApplicationId, SharedStore, StoreError, StorePath};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const SUBDIR_RECOVERY: &str = "recovery";
const SNAPSHOT_FILE: &str = "snapshot";
const SNAPSHOT_TMP_FILE: &str = "snapshot.tmp";
const LOG_FILE: &str = "log";
const LOG_BACKUP_FILE: &str = "log0";

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// Serialized state of a running application.
///
/// Only the identity is interpreted here; the rest travels as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSnapshot {
    pub application_id: ApplicationId,
    #[serde(default)]
    pub state: serde_json::Value,
}

/// Reader and writer for the `recovery/` directory of one application.
pub struct RecoveryStore<'a> {
    store: &'a dyn SharedStore,
    dir: StorePath,
}

impl<'a> RecoveryStore<'a> {
    pub fn new(store: &'a dyn SharedStore, app_path: &StorePath) -> Self {
        Self {
            store,
            dir: app_path.join(SUBDIR_RECOVERY),
        }
    }

    pub fn dir(&self) -> &StorePath {
        &self.dir
    }

    /// The latest snapshot, or `None` when the application never wrote one.
    pub fn restore(&self) -> RecoveryResult<Option<CheckpointSnapshot>> {
        let path = self.dir.join(SNAPSHOT_FILE);
        if !self.store.exists(&path)? {
            return Ok(None);
        }

        let mut bytes = Vec::new();
        self.store
            .open_for_read(&path)?
            .read_to_end(&mut bytes)
            .map_err(|source| RecoveryError::Io { path: path.to_string(), source })?;
        let snapshot = serde_json::from_slice(&bytes)
            .map_err(|source| RecoveryError::Corrupt { path: path.to_string(), source })?;
        debug!(%path, "restored snapshot");
        Ok(Some(snapshot))
    }

    /// Open the current journal for reading, if there is one.
    pub fn open_log(&self) -> RecoveryResult<Option<Box<dyn Read>>> {
        let path = self.dir.join(LOG_FILE);
        if !self.store.exists(&path)? {
            return Ok(None);
        }
        Ok(Some(self.store.open_for_read(&path)?))
    }

    /// Write `snapshot` to `snapshot.tmp`, then move it over `snapshot`.
    pub fn save(&self, snapshot: &CheckpointSnapshot) -> RecoveryResult<()> {
        self.store.mkdirs(&self.dir)?;
        let tmp = self.dir.join(SNAPSHOT_TMP_FILE);
        let path = self.dir.join(SNAPSHOT_FILE);

        let bytes = serde_json::to_vec(snapshot)
            .map_err(|source| RecoveryError::Corrupt { path: tmp.to_string(), source })?;
        let mut out = self.store.create_for_write(&tmp, true)?;
        out.write_all(&bytes)
            .and_then(|_| out.flush())
            .map_err(|source| RecoveryError::Io { path: tmp.to_string(), source })?;
        drop(out);

        self.store.rename(&tmp, &path)?;
        debug!(%path, "saved snapshot");
        Ok(())
    }

    /// Move the current journal to `log0` and return a fresh, empty `log`.
    pub fn rotate_log(&self) -> RecoveryResult<Box<dyn Write>> {
        self.store.mkdirs(&self.dir)?;
        let log = self.dir.join(LOG_FILE);
        let backup = self.dir.join(LOG_BACKUP_FILE);

        if self.store.exists(&log)? {
            self.store.rename(&log, &backup)?;
            debug!(from = %log, to = %backup, "rotated journal");
        }
        Ok(self.store.create_for_write(&log, true)?)
    }
}
