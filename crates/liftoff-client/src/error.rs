//! Launch error types.

use liftoff_core::config::ConfigError;
use liftoff_core::{ApplicationId, ManagerError, StoreError};
use liftoff_resolve::ResolutionError;
use liftoff_stage::StagingError;
use thiserror::Error;

use crate::migrate::MigrationError;

/// Errors that can abort a launch.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{0} is not a valid application type")]
    InvalidApplicationType(String),

    #[error("invalid job descriptor: {0}")]
    InvalidJob(#[from] ConfigError),

    #[error("dependency resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("staging failed: {0}")]
    Staging(#[from] StagingError),

    #[error("restart from prior state failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("security token error: {0}")]
    SecurityToken(String),

    #[error("submission of {app_id} rejected: {diagnostic}")]
    Submission {
        app_id: ApplicationId,
        diagnostic: String,
    },

    #[error("resource manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error("shared store error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("no application has been launched")]
    NotStarted,
}

pub type LaunchResult<T> = Result<T, LaunchError>;
