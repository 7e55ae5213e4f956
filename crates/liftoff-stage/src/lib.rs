//! Staging: copy local or remote artifacts into the shared store.
//!
//! Every artifact lands at `<base>/<basename>`. Inputs without a scheme (or
//! with a `file:` scheme) are uploaded from the local filesystem; anything
//! else is copied store-to-store. Destinations are always overwritten, so
//! staging the same inputs twice leaves the same result.

use liftoff_core::source::SourceError;
use liftoff_core::{LIST_SEPARATOR, SharedStore, StoreError, StorePath, StoreUri};
use thiserror::Error;
use tracing::info;

pub mod local;
pub mod manifest;

pub use local::LocalStore;
pub use manifest::{add_file_to_manifest, add_to_manifest};

/// Result type alias for staging.
pub type StagingResult<T> = Result<T, StagingError>;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("invalid artifact location {input}: {source}")]
    InvalidSource {
        input: String,
        #[source]
        source: SourceError,
    },

    #[error("artifact location has no file name: {0}")]
    NoFileName(String),

    #[error("failed to copy {source_path} to {destination}: {source}")]
    Copy {
        source_path: String,
        destination: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to inspect staged artifact: {0}")]
    Status(#[from] StoreError),
}

/// Copies artifacts into one store.
pub struct ResourceStager<'a> {
    store: &'a dyn SharedStore,
}

impl<'a> ResourceStager<'a> {
    pub fn new(store: &'a dyn SharedStore) -> Self {
        Self { store }
    }

    /// Stage `paths` under `base` and return the comma-joined destinations,
    /// in input order. The first failed copy aborts staging.
    pub fn stage<S: AsRef<str>>(&self, base: &StorePath, paths: &[S]) -> StagingResult<String> {
        let mut destinations = Vec::with_capacity(paths.len());

        for input in paths {
            let input = input.as_ref();
            let source = StoreUri::parse(input).map_err(|source| StagingError::InvalidSource {
                input: input.to_string(),
                source,
            })?;
            let file_name = basename(input).ok_or_else(|| StagingError::NoFileName(input.to_string()))?;
            let dst = base.join(file_name);

            let copied = match &source {
                StoreUri::Local { path } => {
                    info!(source = %input, destination = %dst, "copy from local filesystem");
                    self.store.copy_local_to_store(path, &dst, true)
                }
                StoreUri::Store { uri, .. } => {
                    info!(source = %input, destination = %dst, "copy within shared store");
                    self.store.copy_store_to_store(&StorePath::new(uri.as_str()), &dst, true)
                }
            };
            copied.map_err(|source| StagingError::Copy {
                source_path: input.to_string(),
                destination: dst.to_string(),
                source,
            })?;

            destinations.push(dst.to_string());
        }

        Ok(destinations.join(LIST_SEPARATOR))
    }
}

/// Last non-empty path segment of a location string.
fn basename(location: &str) -> Option<&str> {
    location
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && !name.ends_with(':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, LocalStore, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("store")).unwrap();
        let local = dir.path().join("local");
        fs::create_dir_all(&local).unwrap();
        (dir, store, local)
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/opt/lib/a.jar"), Some("a.jar"));
        assert_eq!(basename("store://nn:8020/libs/b.jar"), Some("b.jar"));
        assert_eq!(basename("dir/"), Some("dir"));
        assert_eq!(basename("file:"), None);
    }

    #[test]
    fn test_stage_returns_destinations_in_input_order() {
        let (_dir, store, local) = setup();
        fs::write(local.join("b.jar"), b"b").unwrap();
        fs::write(local.join("a.jar"), b"a").unwrap();

        let base = StorePath::new("/apps/app1");
        let inputs = [
            local.join("b.jar").display().to_string(),
            format!("file://{}", local.join("a.jar").display()),
        ];
        let csv = ResourceStager::new(&store).stage(&base, &inputs).unwrap();

        assert_eq!(csv, "/apps/app1/b.jar,/apps/app1/a.jar");
        assert!(store.exists(&StorePath::new("/apps/app1/a.jar")).unwrap());
    }

    #[test]
    fn test_stage_copies_store_locations_within_store() {
        let (_dir, store, local) = setup();
        fs::write(local.join("shared.jar"), b"shared").unwrap();
        store
            .copy_local_to_store(&local.join("shared.jar"), &StorePath::new("/libs/shared.jar"), true)
            .unwrap();

        let csv = ResourceStager::new(&store)
            .stage(&StorePath::new("/apps/app2"), &["local://cluster/libs/shared.jar"])
            .unwrap();

        assert_eq!(csv, "/apps/app2/shared.jar");
        assert_eq!(store.get_status(&StorePath::new("/apps/app2/shared.jar")).unwrap().len, 6);
    }

    #[test]
    fn test_stage_aborts_on_first_failure() {
        let (_dir, store, local) = setup();
        fs::write(local.join("ok.jar"), b"ok").unwrap();
        let inputs = [
            local.join("missing.jar").display().to_string(),
            local.join("ok.jar").display().to_string(),
        ];

        let err = ResourceStager::new(&store)
            .stage(&StorePath::new("/apps/app3"), &inputs)
            .unwrap_err();

        assert!(matches!(err, StagingError::Copy { ref source_path, .. } if source_path.ends_with("missing.jar")));
        assert!(!store.exists(&StorePath::new("/apps/app3/ok.jar")).unwrap());
    }

    #[test]
    fn test_stage_twice_is_idempotent() {
        let (_dir, store, local) = setup();
        fs::write(local.join("app.jar"), b"v1").unwrap();
        let inputs = [local.join("app.jar").display().to_string()];
        let base = StorePath::new("/apps/app4");
        let stager = ResourceStager::new(&store);

        let first = stager.stage(&base, &inputs).unwrap();
        let second = stager.stage(&base, &inputs).unwrap();

        assert_eq!(first, second);
        let staged = store.root().join("apps/app4/app.jar");
        assert_eq!(fs::read(staged).unwrap(), b"v1");
    }
}
