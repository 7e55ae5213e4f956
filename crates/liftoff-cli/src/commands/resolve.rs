use std::path::Path;

use anyhow::Context;
use liftoff_core::{JobDescriptor, LaunchConfig};
use liftoff_resolve::{DependencyResolver, Registry, mandatory_components};

pub fn resolve(
    job_path: &str,
    registry_paths: &[String],
    secure: bool,
    config_path: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => LaunchConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to read launcher configuration {path}"))?,
        None => LaunchConfig::default(),
    };
    let job = JobDescriptor::from_file(Path::new(job_path))
        .with_context(|| format!("failed to read job descriptor {job_path}"))?;
    job.validate()?;

    let lib_dir = config
        .platform_lib_dir()
        .context("platform library directory unknown: set platform_lib_dir or LIFTOFF_HOME")?;
    let registry = load_registry(&lib_dir, registry_paths)?;

    let mandatory = mandatory_components(secure || config.security_enabled);
    let archives = DependencyResolver::new(&registry).resolve(&job, &mandatory)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(archives.as_slice())?),
        _ => {
            for archive in archives.iter() {
                println!("{archive}");
            }
        }
    }
    Ok(())
}

/// Built-in platform components plus every registry file, later files
/// overriding earlier declarations.
pub fn load_registry(lib_dir: &Path, registry_paths: &[String]) -> anyhow::Result<Registry> {
    let mut registry = Registry::builtin(lib_dir);
    for path in registry_paths {
        registry.merge(Registry::load(Path::new(path))?);
    }
    Ok(registry)
}
