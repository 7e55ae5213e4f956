//! Dependency closure over the component registry.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use liftoff_core::{ArchiveSet, JobDescriptor, csv_entries};
use tracing::{debug, info};

use crate::error::{ResolutionError, ResolveResult};
use crate::registry::{Component, ROOT_COMPONENT, Registry};

/// Platform components whose archives every job ships with.
pub const PLATFORM_COMPONENTS: &[&str] = &[
    "liftoff.netlet.Slice",
    "liftoff.netlet.EventLoop",
    "liftoff.bufferserver.Server",
    "liftoff.engine.StreamingAppMaster",
    "liftoff.api.StreamCodec",
    "liftoff.common.FsStorageAgent",
    "javax.validation.ConstraintViolationException",
    "com.esotericsoftware.kryo.Kryo",
    "org.apache.bval.jsr303.ApacheValidationProvider",
    "org.apache.bval.BeanValidationContext",
    "org.apache.commons.lang3.ClassUtils",
    "net.engio.mbassy.bus.MBassador",
    "org.codehaus.jackson.annotate.JsonUnwrapped",
    "org.codehaus.jackson.map.ser.std.RawSerializer",
    "org.apache.commons.beanutils.BeanUtils",
    "org.apache.http.client.utils.URLEncodedUtils",
    "org.apache.http.message.BasicHeaderValueParser",
    "com.esotericsoftware.minlog.Log",
    "org.apache.xbean.asm5.tree.ClassNode",
    "org.jctools.queues.SpscArrayQueue",
];

/// Additional components required only when the cluster runs secured.
pub const SECURITY_COMPONENTS: &[&str] = &[];

/// The mandatory component list for the given security mode.
pub fn mandatory_components(secure: bool) -> Vec<&'static str> {
    let mut components = PLATFORM_COMPONENTS.to_vec();
    if secure {
        components.extend_from_slice(SECURITY_COMPONENTS);
    }
    components
}

/// Computes the [`ArchiveSet`] a job needs.
pub struct DependencyResolver<'a> {
    registry: &'a Registry,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Resolve the job's components, their parents and interfaces, and the
    /// mandatory list into archives, then append `library_archives`.
    ///
    /// Order is discovery order. Any unknown referenced component or
    /// unresolvable archive fails the whole resolution.
    pub fn resolve(&self, job: &JobDescriptor, mandatory: &[&str]) -> ResolveResult<ArchiveSet> {
        let mut loaded = Vec::with_capacity(job.components.len());
        for name in &job.components {
            let component = self
                .registry
                .get(name)
                .ok_or_else(|| ResolutionError::UnknownComponent(name.clone()))?;
            loaded.push(component);
        }

        let mut dependencies: Vec<&'a str> = loaded.iter().map(|c| c.name.as_str()).collect();
        for component in &loaded {
            self.collect_lineage(component, &mut dependencies)?;
        }

        for name in mandatory {
            let component = self
                .registry
                .get(name)
                .ok_or_else(|| ResolutionError::UnknownComponent(name.to_string()))?;
            dependencies.push(component.name.as_str());
        }

        if job.debug {
            debug!(?dependencies, "deploy dependencies");
        }

        let mut archives = ArchiveSet::new();
        let mut source_to_archive: HashMap<&'a Path, String> = HashMap::new();

        for name in dependencies {
            let Some(location) = self.registry.get(name).and_then(|c| c.archive.as_deref()) else {
                // bootstrap type or undeclared interface
                continue;
            };

            let archive = match source_to_archive.get(location) {
                Some(archive) => archive.clone(),
                None => {
                    let archive = locate_archive(name, location)?;
                    debug!(source = %location.display(), %archive, "added code source");
                    source_to_archive.insert(location, archive.clone());
                    archive
                }
            };
            archives.insert(archive);
        }

        if let Some(csv) = &job.library_archives {
            archives.extend(csv_entries(csv));
        }

        info!(count = archives.len(), archives = %archives, "local archive dependencies");
        Ok(archives)
    }

    /// Push `component`, each ancestor below the root, and every interface
    /// declared along the way.
    fn collect_lineage(
        &self,
        component: &'a Component,
        dependencies: &mut Vec<&'a str>,
    ) -> ResolveResult<()> {
        let mut visited = HashSet::new();
        let mut current = Some(component);

        while let Some(c) = current {
            if !visited.insert(c.name.as_str()) {
                return Err(ResolutionError::InheritanceCycle(c.name.clone()));
            }
            dependencies.push(c.name.as_str());
            dependencies.extend(c.implements.iter().map(String::as_str));

            current = c
                .extends
                .as_deref()
                .filter(|parent| *parent != ROOT_COMPONENT)
                .and_then(|parent| self.registry.get(parent));
        }
        Ok(())
    }
}

/// Map a code-source location to the archive file on disk.
fn locate_archive(component: &str, location: &Path) -> ResolveResult<String> {
    let missing = |reason: String| ResolutionError::MissingArchive {
        component: component.to_string(),
        location: location.display().to_string(),
        reason,
    };

    let metadata = std::fs::metadata(location).map_err(|e| missing(e.to_string()))?;
    if !metadata.is_file() {
        return Err(missing("not a packaged archive".to_string()));
    }
    let canonical = location.canonicalize().map_err(|e| missing(e.to_string()))?;
    Ok(canonical.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    struct Fixture {
        _dir: tempfile::TempDir,
        lib: PathBuf,
        registry: Registry,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        fs::create_dir_all(&lib).unwrap();
        for jar in ["ops.jar", "base.jar", "iface.jar", "platform.jar"] {
            fs::write(lib.join(jar), b"PK").unwrap();
        }

        let mut registry = Registry::new();
        registry.insert(Component::new(ROOT_COMPONENT, None));
        registry.insert(Component::new("platform.Runtime", Some(lib.join("platform.jar"))));
        registry.insert(Component::new("api.Operator", Some(lib.join("iface.jar"))));
        registry.insert(
            Component::new("base.BaseOperator", Some(lib.join("base.jar")))
                .extending(ROOT_COMPONENT)
                .implementing("api.Operator"),
        );
        registry.insert(
            Component::new("ops.Counter", Some(lib.join("ops.jar")))
                .extending("base.BaseOperator")
                .implementing("java.io.Serializable"),
        );
        registry.insert(Component::new("ops.Splitter", Some(lib.join("ops.jar"))).extending("base.BaseOperator"));

        Fixture { _dir: dir, lib, registry }
    }

    fn canonical(path: PathBuf) -> String {
        path.canonicalize().unwrap().display().to_string()
    }

    #[test]
    fn resolves_in_discovery_order() {
        let f = fixture();
        let mut job = JobDescriptor::new("wc");
        job.components = vec!["ops.Counter".to_string()];

        let archives = DependencyResolver::new(&f.registry)
            .resolve(&job, &["platform.Runtime"])
            .unwrap();

        let expected: Vec<String> = ["ops.jar", "base.jar", "iface.jar", "platform.jar"]
            .iter()
            .map(|jar| canonical(f.lib.join(jar)))
            .collect();
        assert_eq!(archives.as_slice(), expected.as_slice());
    }

    #[test]
    fn shared_code_source_yields_one_archive() {
        let f = fixture();
        let mut job = JobDescriptor::new("wc");
        job.components = vec!["ops.Counter".to_string(), "ops.Splitter".to_string()];

        let archives = DependencyResolver::new(&f.registry).resolve(&job, &[]).unwrap();

        let ops = canonical(f.lib.join("ops.jar"));
        assert_eq!(archives.iter().filter(|a| *a == ops).count(), 1);
        assert_eq!(archives.len(), 3);
    }

    #[test]
    fn unknown_component_fails_without_partial_result() {
        let f = fixture();
        let mut job = JobDescriptor::new("wc");
        job.components = vec!["ops.Counter".to_string(), "ops.Missing".to_string()];

        let err = DependencyResolver::new(&f.registry).resolve(&job, &[]).unwrap_err();
        assert!(matches!(err, ResolutionError::UnknownComponent(name) if name == "ops.Missing"));
    }

    #[test]
    fn missing_archive_file_is_fatal() {
        let mut f = fixture();
        f.registry.insert(Component::new("ops.Ghost", Some(f.lib.join("ghost.jar"))));
        let mut job = JobDescriptor::new("wc");
        job.components = vec!["ops.Ghost".to_string()];

        let err = DependencyResolver::new(&f.registry).resolve(&job, &[]).unwrap_err();
        assert!(matches!(err, ResolutionError::MissingArchive { component, .. } if component == "ops.Ghost"));
    }

    #[test]
    fn directory_code_source_is_not_an_archive() {
        let mut f = fixture();
        f.registry.insert(Component::new("ops.Classes", Some(f.lib.clone())));
        let mut job = JobDescriptor::new("wc");
        job.components = vec!["ops.Classes".to_string()];

        let err = DependencyResolver::new(&f.registry).resolve(&job, &[]).unwrap_err();
        assert!(err.to_string().contains("not a packaged archive"));
    }

    #[test]
    fn inheritance_cycle_is_reported() {
        let mut f = fixture();
        f.registry.insert(Component::new("cyc.A", None).extending("cyc.B"));
        f.registry.insert(Component::new("cyc.B", None).extending("cyc.A"));
        let mut job = JobDescriptor::new("wc");
        job.components = vec!["cyc.A".to_string()];

        let err = DependencyResolver::new(&f.registry).resolve(&job, &[]).unwrap_err();
        assert!(matches!(err, ResolutionError::InheritanceCycle(_)));
    }

    #[test]
    fn library_archives_are_appended_verbatim() {
        let f = fixture();
        let mut job = JobDescriptor::new("wc");
        job.library_archives = Some("/extra/a.jar,/extra/b.jar".to_string());

        let archives = DependencyResolver::new(&f.registry)
            .resolve(&job, &["platform.Runtime"])
            .unwrap();

        let entries: Vec<&str> = archives.iter().collect();
        assert_eq!(entries[1..], ["/extra/a.jar", "/extra/b.jar"]);
    }

    #[test]
    fn mandatory_list_includes_security_extras_only_when_secure() {
        assert_eq!(mandatory_components(false).len(), PLATFORM_COMPONENTS.len());
        assert_eq!(
            mandatory_components(true).len(),
            PLATFORM_COMPONENTS.len() + SECURITY_COMPONENTS.len()
        );
    }
}
