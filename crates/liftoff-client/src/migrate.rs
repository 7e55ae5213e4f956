//! Restart support: carry a prior run's persisted state into a new run.

use std::fmt;
use std::io;

use liftoff_core::{ApplicationId, SharedStore, StorePath};
use thiserror::Error;
use tracing::{debug, info};

use crate::SUBDIR_CHECKPOINTS;
use crate::recovery::{RecoveryError, RecoveryStore};

/// Stage of a migration, reported when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    ClearCheckpoints,
    SaveSnapshot,
    RotateLog,
    CopyLog,
    CopySubdirectories,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationStep::ClearCheckpoints => "clear checkpoints",
            MigrationStep::SaveSnapshot => "save snapshot",
            MigrationStep::RotateLog => "rotate log",
            MigrationStep::CopyLog => "copy log",
            MigrationStep::CopySubdirectories => "copy subdirectories",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("no previous application state found in {0}")]
    NoPriorState(String),

    #[error("failed to read prior state: {0}")]
    Restore(#[source] RecoveryError),

    /// The destination is left partially migrated.
    #[error("migration step '{step}' failed: {source}")]
    Step {
        step: MigrationStep,
        #[source]
        source: RecoveryError,
    },
}

pub type MigrationResult<T> = Result<T, MigrationError>;

fn at<E: Into<RecoveryError>>(step: MigrationStep) -> impl FnOnce(E) -> MigrationError {
    move |e| MigrationError::Step { step, source: e.into() }
}

/// Copies recovery state, checkpoints and other persisted subdirectories
/// from a previous application path into a new one.
pub struct CheckpointMigrator<'a> {
    store: &'a dyn SharedStore,
}

impl<'a> CheckpointMigrator<'a> {
    pub fn new(store: &'a dyn SharedStore) -> Self {
        Self { store }
    }

    /// Migrate `source` into `dest`, rewriting the snapshot's identity to
    /// `new_identity`. Subdirectories already present under `dest` are left
    /// untouched.
    pub fn migrate(
        &self,
        source: &StorePath,
        dest: &StorePath,
        new_identity: ApplicationId,
    ) -> MigrationResult<()> {
        let prior = RecoveryStore::new(self.store, source);
        let mut snapshot = prior
            .restore()
            .map_err(MigrationError::Restore)?
            .ok_or_else(|| MigrationError::NoPriorState(source.to_string()))?;
        let mut log = prior.open_log().map_err(MigrationError::Restore)?;

        info!(from = %snapshot.application_id, to = %new_identity, "switching snapshot identity");
        snapshot.application_id = new_identity;

        // recreated from the prior run below
        let checkpoints = dest.join(SUBDIR_CHECKPOINTS);
        self.store
            .delete(&checkpoints, true)
            .map_err(at(MigrationStep::ClearCheckpoints))?;

        let target = RecoveryStore::new(self.store, dest);
        target.save(&snapshot).map_err(at(MigrationStep::SaveSnapshot))?;

        let mut out = target.rotate_log().map_err(at(MigrationStep::RotateLog))?;
        if let Some(log) = log.as_mut() {
            let copied = io::copy(log, &mut out)
                .and_then(|n| out.flush().map(|_| n))
                .map_err(|source| RecoveryError::Io {
                    path: target.dir().to_string(),
                    source,
                })
                .map_err(at(MigrationStep::CopyLog))?;
            debug!(bytes = copied, "copied prior journal");
        }
        drop(out);
        drop(log);

        for child in self
            .store
            .list_children(source)
            .map_err(at(MigrationStep::CopySubdirectories))?
        {
            if !child.is_dir {
                continue;
            }
            let target_path = dest.join(child.path.name());
            if self
                .store
                .exists(&target_path)
                .map_err(at(MigrationStep::CopySubdirectories))?
            {
                debug!(source = %child.path, target = %target_path, "ignoring, already exists");
                continue;
            }
            debug!(source = %child.path, target = %target_path, "copying");
            self.store
                .copy_store_to_store(&child.path, &target_path, false)
                .map_err(at(MigrationStep::CopySubdirectories))?;
        }

        info!(%source, %dest, "migrated prior application state");
        Ok(())
    }
}
