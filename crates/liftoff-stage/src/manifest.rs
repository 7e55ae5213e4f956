//! Resource manifest entries for staged artifacts.

use liftoff_core::{
    FileStatus, LocalResource, ResourceKind, ResourceManifest, SharedStore, StorePath, Visibility,
    csv_entries,
};
use tracing::debug;

use crate::StagingResult;

/// Add one manifest entry per staged location in `csv`, keyed by file name.
pub fn add_to_manifest(
    kind: ResourceKind,
    csv: &str,
    manifest: &mut ResourceManifest,
    store: &dyn SharedStore,
) -> StagingResult<()> {
    for location in csv_entries(csv) {
        let path = StorePath::new(location);
        let status = store.get_status(&path)?;
        let name = path.name().to_string();
        add_file_to_manifest(&name, &status, kind, manifest);
    }
    Ok(())
}

/// Record `status` under `name`, application-visible.
pub fn add_file_to_manifest(
    name: &str,
    status: &FileStatus,
    kind: ResourceKind,
    manifest: &mut ResourceManifest,
) {
    debug!(name, location = %status.path, size = status.len, "manifest entry");
    manifest.insert(
        name.to_string(),
        LocalResource {
            kind,
            visibility: Visibility::Application,
            location: status.path.to_string(),
            size: status.len,
            timestamp: status.modification_time,
        },
    );
}
