//! Resolver error types.

use thiserror::Error;

/// Result type alias for dependency resolution.
pub type ResolveResult<T> = Result<T, ResolutionError>;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to load component {0}")]
    UnknownComponent(String),

    #[error("cannot resolve archive for {component} from {location}: {reason}")]
    MissingArchive {
        component: String,
        location: String,
        reason: String,
    },

    #[error("component {0} inherits from itself")]
    InheritanceCycle(String),

    #[error("failed to read registry {path}: {reason}")]
    Registry { path: String, reason: String },
}
