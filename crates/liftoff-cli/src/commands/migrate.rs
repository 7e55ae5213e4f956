use anyhow::Context;
use liftoff_client::CheckpointMigrator;
use liftoff_core::{ApplicationId, StorePath};
use liftoff_stage::LocalStore;

pub fn migrate(root: &str, from: &str, to: &str, app_id: &str) -> anyhow::Result<()> {
    let app_id: ApplicationId = app_id.parse()?;
    let store = LocalStore::new(root)?;

    CheckpointMigrator::new(&store)
        .migrate(&StorePath::new(from), &StorePath::new(to), app_id)
        .with_context(|| format!("failed to migrate {from} to {to}"))?;

    println!("✓ Migrated {from} → {to} as {app_id}");
    Ok(())
}
