use std::path::Path;

use anyhow::Context;
use liftoff_core::{JobDescriptor, StorePath, csv_entries};
use liftoff_stage::{LocalStore, ResourceStager};

pub fn stage(job_path: &str, root: &str, dest: &str) -> anyhow::Result<()> {
    let job = JobDescriptor::from_file(Path::new(job_path))
        .with_context(|| format!("failed to read job descriptor {job_path}"))?;
    let store = LocalStore::new(root)?;

    for (label, staged) in stage_job(&job, &store, &StorePath::new(dest))? {
        println!("{label}: {staged}");
    }
    Ok(())
}

/// Stage every CSV-valued input of `job` under `dest`, returning the
/// staged CSV per input kind.
pub fn stage_job(
    job: &JobDescriptor,
    store: &LocalStore,
    dest: &StorePath,
) -> anyhow::Result<Vec<(&'static str, String)>> {
    let stager = ResourceStager::new(store);
    let inputs = [
        ("libjars", job.library_archives.as_deref()),
        ("archives", job.archives.as_deref()),
        ("files", job.files.as_deref()),
    ];

    let mut staged = Vec::new();
    for (label, csv) in inputs {
        let Some(csv) = csv else { continue };
        let paths: Vec<&str> = csv_entries(csv).collect();
        let result = stager
            .stage(dest, paths.as_slice())
            .with_context(|| format!("failed to stage {label}"))?;
        staged.push((label, result));
    }
    Ok(staged)
}
