//! Submission assembly: everything between reserving an application id and
//! handing the finished descriptor to the resource manager.

use std::collections::BTreeMap;
use std::io::Write;

use liftoff_core::config::{ContainerOptsConfigurator, StorageAgentConfig};
use liftoff_core::{
    ApplicationId, ArchiveSet, Credentials, JobDescriptor, LaunchConfig, LaunchContext,
    ManagerError, Resource, ResourceKind, ResourceManager, ResourceManifest, SharedStore,
    StoreError, StorePath, SubmissionDescriptor, csv_entries,
};
use liftoff_stage::{ResourceStager, StagingError, add_file_to_manifest, add_to_manifest};
use tracing::{debug, info};

use crate::error::{LaunchError, LaunchResult};
use crate::migrate::CheckpointMigrator;
use crate::{JOB_DESCRIPTOR_FILE, LAUNCH_CONFIG_FILE, SUBDIR_CHECKPOINTS};

/// Classpath entries used when the launch configuration sets none.
pub const DEFAULT_APPLICATION_CLASSPATH: &[&str] = &[
    "$HADOOP_CONF_DIR",
    "$HADOOP_COMMON_HOME/share/hadoop/common/*",
    "$HADOOP_COMMON_HOME/share/hadoop/common/lib/*",
    "$HADOOP_HDFS_HOME/share/hadoop/hdfs/*",
    "$HADOOP_HDFS_HOME/share/hadoop/hdfs/lib/*",
    "$HADOOP_YARN_HOME/share/hadoop/yarn/*",
    "$HADOOP_YARN_HOME/share/hadoop/yarn/lib/*",
];

/// Client configuration directory; never shipped to the master.
const CLIENT_CONF_DIR: &str = "$HADOOP_CLIENT_CONF_DIR";

/// Expanded by the node manager to the container log directory.
pub const LOG_DIR_EXPANSION: &str = "<LOG_DIR>";

/// Entry point of the master process.
pub const MASTER_ENTRY_POINT: &str = "liftoff.engine.StreamingAppMaster";

/// Staged name of the logging configuration, and the resource name the
/// master sees it under.
const LOG_CONFIG_STAGED: &str = "log4j.props";
const LOG_CONFIG_RESOURCE: &str = "log4j.properties";

const MASTER_PRIORITY: u32 = 0;

/// Cap the requested master memory at the cluster's maximum.
pub fn clamp_memory(requested_mb: u32, max_mb: u32) -> u32 {
    requested_mb.min(max_mb)
}

/// Heap size flag for a container of `memory_mb`: three quarters of it.
pub fn heap_size_flag(memory_mb: u32) -> String {
    format!("-Xmx{}m", u64::from(memory_mb) * 3 / 4)
}

/// `./*` followed by the configured (or default) classpath entries.
pub fn master_classpath(entries: Option<&[String]>) -> String {
    let configured: Vec<&str> = match entries {
        Some(entries) if !entries.is_empty() => entries.iter().map(String::as_str).collect(),
        _ => DEFAULT_APPLICATION_CLASSPATH.to_vec(),
    };

    let mut classpath = String::from("./*");
    for entry in configured.into_iter().map(str::trim) {
        if entry.is_empty() || entry == CLIENT_CONF_DIR {
            continue;
        }
        classpath.push(':');
        classpath.push_str(entry);
    }
    classpath
}

/// Master command tokens, in launch order.
pub fn master_command(
    job: &JobDescriptor,
    config: &LaunchConfig,
    app_id: ApplicationId,
    memory_mb: u32,
    app_path: &StorePath,
) -> Vec<String> {
    let mut args = vec![config.java_cmd.clone()];
    if job.debug {
        args.push("-agentlib:jdwp=transport=dt_socket,server=y,suspend=n".to_string());
    }
    if let Some(options) = &job.master_jvm_options {
        args.push(options.clone());
    }
    args.push("-Djava.io.tmpdir=$PWD/tmp".to_string());
    args.push(heap_size_flag(memory_mb));
    args.push("-XX:+HeapDumpOnOutOfMemoryError".to_string());
    args.push(format!("-XX:HeapDumpPath={}/heap-{}.bin", config.heap_dump_dir, app_id.id));
    args.push(format!(
        "-Dhadoop.root.logger={},RFA",
        if job.debug { "DEBUG" } else { "INFO" }
    ));
    args.push(format!("-Dhadoop.log.dir={LOG_DIR_EXPANSION}"));
    args.push(format!("-Dliftoff.application.path={app_path}"));
    if job.debug {
        args.push("-Dlog4j.debug=true".to_string());
    }
    if let Some(level) = &config.loggers_level {
        args.push(format!("-Dliftoff.loggers.level={level}"));
    }
    args.push(MASTER_ENTRY_POINT.to_string());
    args.push(format!("1>{LOG_DIR_EXPANSION}/AppMaster.stdout"));
    args.push(format!("2>{LOG_DIR_EXPANSION}/AppMaster.stderr"));
    args
}

/// Builds the [`SubmissionDescriptor`] for one launch attempt and submits it.
pub struct SubmissionBuilder<'a> {
    manager: &'a dyn ResourceManager,
    store: &'a dyn SharedStore,
    config: &'a LaunchConfig,
}

impl<'a> SubmissionBuilder<'a> {
    pub fn new(
        manager: &'a dyn ResourceManager,
        store: &'a dyn SharedStore,
        config: &'a LaunchConfig,
    ) -> Self {
        Self { manager, store, config }
    }

    /// Reserve an application id, stage `archives` and the job's optional
    /// inputs, migrate prior state on restart, and assemble the descriptor.
    ///
    /// Results are stamped onto `job.launch`.
    pub fn build(
        &self,
        job: &mut JobDescriptor,
        archives: &ArchiveSet,
    ) -> LaunchResult<SubmissionDescriptor> {
        let new_app = self.manager.create_application()?;
        let app_id = new_app.application_id;
        let max_mb = new_app.max_capability.memory_mb;
        info!(%app_id, max_mb, "max mem capability of resources in this cluster");

        let memory_mb = clamp_memory(job.master_memory_mb, max_mb);
        if memory_mb < job.master_memory_mb {
            info!(
                specified = job.master_memory_mb,
                max = max_mb,
                "master memory above cluster maximum, using max"
            );
        }
        job.launch.application_id.get_or_insert(app_id);

        let tokens = self.credentials()?;

        let apps_base = StorePath::new(self.config.apps_base_dir.as_str());
        let app_path = match &job.application_path {
            Some(path) => StorePath::new(path.as_str()),
            None => apps_base.join(&app_id.to_string()),
        };

        let mut manifest = ResourceManifest::new();
        self.stage_inputs(job, archives, &app_path, &mut manifest)?;
        job.launch.application_path = Some(app_path.to_string());

        if job.storage_agent.is_none() {
            job.storage_agent = Some(StorageAgentConfig::AsyncFs {
                path: app_path.join(SUBDIR_CHECKPOINTS).to_string(),
            });
        }
        if job.container_opts.is_none() {
            job.container_opts = Some(ContainerOptsConfigurator::Basic);
        }

        if let Some(log_config) = &self.config.log_config_file {
            let dst = app_path.join(LOG_CONFIG_STAGED);
            let status = self
                .store
                .copy_local_to_store(log_config, &dst, true)
                .and_then(|_| self.store.get_status(&dst))
                .map_err(|source| StagingError::Copy {
                    source_path: log_config.display().to_string(),
                    destination: dst.to_string(),
                    source,
                })?;
            add_file_to_manifest(LOG_CONFIG_RESOURCE, &status, ResourceKind::File, &mut manifest);
        }

        if let Some(original) = job.original_application_id()? {
            let original_path = apps_base.join(&original.to_string());
            info!(from = %original_path, "restart");
            CheckpointMigrator::new(self.store).migrate(&original_path, &app_path, app_id)?;
        }

        let descriptor_bytes = job
            .to_json_vec()
            .map_err(|e| LaunchError::Serialize(e.to_string()))?;
        self.write_resource(&app_path, JOB_DESCRIPTOR_FILE, &descriptor_bytes, &mut manifest)?;

        let config_toml = self
            .config
            .to_toml_string()
            .map_err(|e| LaunchError::Serialize(e.to_string()))?;
        self.write_resource(&app_path, LAUNCH_CONFIG_FILE, config_toml.as_bytes(), &mut manifest)?;

        let mut environment = BTreeMap::new();
        environment.insert(
            "CLASSPATH".to_string(),
            master_classpath(self.config.application_classpath.as_deref()),
        );
        environment.insert("HADOOP_USER_NAME".to_string(), self.config.effective_user());

        let launch_context = LaunchContext {
            local_resources: manifest,
            environment,
            commands: master_command(job, self.config, app_id, memory_mb, &app_path),
            tokens,
        };
        info!(command = %launch_context.command_line(), "completed setting up master command");

        Ok(SubmissionDescriptor {
            application_id: app_id,
            name: job.name.clone(),
            application_type: job.application_type.clone(),
            queue: job.queue.clone(),
            resource: Resource { memory_mb },
            priority: MASTER_PRIORITY,
            launch_context,
        })
    }

    /// Hand `descriptor` to the resource manager.
    pub fn submit(&self, descriptor: &SubmissionDescriptor) -> LaunchResult<()> {
        info!(
            name = %descriptor.name,
            queue = ?descriptor.queue,
            user = %self.config.effective_user(),
            memory_mb = descriptor.resource.memory_mb,
            "submitting application"
        );
        self.manager
            .submit_application(descriptor)
            .map_err(|e| match e {
                ManagerError::Rejected(diagnostic) => LaunchError::Submission {
                    app_id: descriptor.application_id,
                    diagnostic,
                },
                other => LaunchError::Manager(other),
            })
    }

    /// Delegation tokens for the store and the resource manager, serialized
    /// for the launch context. `None` outside secure mode.
    fn credentials(&self) -> LaunchResult<Option<Vec<u8>>> {
        if !self.config.security_enabled {
            return Ok(None);
        }
        let renewer = self
            .config
            .rm_principal
            .as_deref()
            .filter(|principal| !principal.is_empty())
            .ok_or_else(|| {
                LaunchError::SecurityToken(
                    "no resource manager principal configured as token renewer".to_string(),
                )
            })?;

        let mut credentials = Credentials::default();
        let store_tokens = self
            .store
            .delegation_tokens(renewer)
            .map_err(|e| LaunchError::SecurityToken(e.to_string()))?;
        for token in store_tokens {
            info!(store = %self.store.uri(), kind = %token.kind, "got delegation token");
            credentials.add_token(token);
        }
        let rm_token = self
            .manager
            .delegation_token(renewer)
            .map_err(|e| LaunchError::SecurityToken(e.to_string()))?;
        credentials.add_token(rm_token);

        let bytes = credentials
            .to_bytes()
            .map_err(|e| LaunchError::Serialize(e.to_string()))?;
        Ok(Some(bytes))
    }

    fn stage_inputs(
        &self,
        job: &mut JobDescriptor,
        archives: &ArchiveSet,
        app_path: &StorePath,
        manifest: &mut ResourceManifest,
    ) -> LaunchResult<()> {
        let stager = ResourceStager::new(self.store);

        let libjars = stager.stage(app_path, archives.as_slice())?;
        info!(%libjars, "libjars");
        add_to_manifest(ResourceKind::File, &libjars, manifest, self.store)?;
        job.launch.library_archives = Some(libjars);

        if let Some(csv) = &job.archives {
            let inputs: Vec<&str> = csv_entries(csv).collect();
            let staged = stager.stage(app_path, inputs.as_slice())?;
            info!(archives = %staged, "archives");
            add_to_manifest(ResourceKind::Archive, &staged, manifest, self.store)?;
            job.launch.archives = Some(staged);
        }

        if let Some(csv) = &job.files {
            let inputs: Vec<&str> = csv_entries(csv).collect();
            let staged = stager.stage(app_path, inputs.as_slice())?;
            info!(files = %staged, "files");
            add_to_manifest(ResourceKind::File, &staged, manifest, self.store)?;
            job.launch.files = Some(staged);
        }
        Ok(())
    }

    fn write_resource(
        &self,
        app_path: &StorePath,
        name: &str,
        bytes: &[u8],
        manifest: &mut ResourceManifest,
    ) -> LaunchResult<()> {
        let path = app_path.join(name);
        let mut out = self.store.create_for_write(&path, true)?;
        out.write_all(bytes)
            .and_then(|_| out.flush())
            .map_err(|e| StoreError::io(&path, e))?;
        drop(out);

        let status = self.store.get_status(&path)?;
        debug!(%path, size = status.len, "wrote launch resource");
        add_file_to_manifest(name, &status, ResourceKind::File, manifest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_caps_at_cluster_max() {
        assert_eq!(clamp_memory(8192, 4096), 4096);
        assert_eq!(clamp_memory(1024, 4096), 1024);
    }

    #[test]
    fn heap_is_three_quarters_of_container() {
        assert_eq!(heap_size_flag(4096), "-Xmx3072m");
        assert_eq!(heap_size_flag(1000), "-Xmx750m");
    }

    #[test]
    fn classpath_skips_client_conf_dir() {
        let entries = vec![
            "$HADOOP_CONF_DIR".to_string(),
            " $HADOOP_CLIENT_CONF_DIR ".to_string(),
            "/opt/lib/*".to_string(),
        ];
        assert_eq!(master_classpath(Some(&entries)), "./*:$HADOOP_CONF_DIR:/opt/lib/*");
    }

    #[test]
    fn classpath_defaults_when_unset() {
        let classpath = master_classpath(None);
        assert!(classpath.starts_with("./*:$HADOOP_CONF_DIR:"));
        assert_eq!(classpath.matches(':').count(), DEFAULT_APPLICATION_CLASSPATH.len());
    }

    #[test]
    fn command_order_and_debug_flags() {
        let mut job = JobDescriptor::new("wc");
        job.debug = true;
        job.master_jvm_options = Some("-XX:+UseG1GC".to_string());
        let config = LaunchConfig {
            loggers_level: Some("com.example:DEBUG".to_string()),
            ..LaunchConfig::default()
        };
        let app_path = StorePath::new("/apps/application_1_0007");

        let args = master_command(&job, &config, ApplicationId::new(1, 7), 2048, &app_path);

        assert_eq!(args[0], "${JAVA_HOME}/bin/java");
        assert!(args[1].starts_with("-agentlib:jdwp"));
        assert_eq!(args[2], "-XX:+UseG1GC");
        assert_eq!(args[3], "-Djava.io.tmpdir=$PWD/tmp");
        assert_eq!(args[4], "-Xmx1536m");
        assert!(args.contains(&"-XX:HeapDumpPath=/tmp/heap-7.bin".to_string()));
        assert!(args.contains(&"-Dhadoop.root.logger=DEBUG,RFA".to_string()));
        assert!(args.contains(&"-Dliftoff.application.path=/apps/application_1_0007".to_string()));
        assert!(args.contains(&"-Dliftoff.loggers.level=com.example:DEBUG".to_string()));

        let entry = args.iter().position(|a| a == MASTER_ENTRY_POINT).unwrap();
        assert_eq!(args.len() - entry, 3);
        assert_eq!(args.last().unwrap(), "2><LOG_DIR>/AppMaster.stderr");
    }

    #[test]
    fn command_without_debug_omits_debug_flags() {
        let job = JobDescriptor::new("wc");
        let args = master_command(
            &job,
            &LaunchConfig::default(),
            ApplicationId::new(1, 1),
            1024,
            &StorePath::new("/apps/a"),
        );
        assert!(!args.iter().any(|a| a.starts_with("-agentlib") || a == "-Dlog4j.debug=true"));
        assert!(args.contains(&"-Dhadoop.root.logger=INFO,RFA".to_string()));
    }
}
