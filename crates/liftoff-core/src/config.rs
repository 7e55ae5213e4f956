//! Job descriptor (`job.toml`) and launcher configuration (`liftoff.toml`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{APPLICATION_TYPE, ApplicationId};

/// Current `JobDescriptor` schema version.
pub const JOB_DESCRIPTOR_VERSION: u32 = 1;

/// Environment variable pointing at the Liftoff installation.
pub const LIFTOFF_HOME_ENV: &str = "LIFTOFF_HOME";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unsupported job descriptor version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("job name must not be empty")]
    MissingName,
    #[error("master memory must be positive")]
    InvalidMemory,
    #[error("invalid original application id: {0}")]
    InvalidOriginalAppId(String),
}

// ── Job descriptor ─────────────────────────────────────────────────

/// Description of one distributed job to launch.
///
/// Everything outside [`JobDescriptor::launch`] is caller input. The launcher
/// writes its results into `launch` and fills `storage_agent` and
/// `container_opts` only when the caller left them empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDescriptor {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    pub queue: Option<String>,
    #[serde(default = "default_master_memory_mb")]
    pub master_memory_mb: u32,
    /// Extra JVM options for the master process, passed through verbatim.
    pub master_jvm_options: Option<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_application_type")]
    pub application_type: String,
    /// Set to restart from a previous run's persisted state.
    pub original_app_id: Option<String>,
    /// CSV of archive bundles extracted on the nodes.
    pub archives: Option<String>,
    /// CSV of plain files shipped with the job.
    pub files: Option<String>,
    /// Extra archive locations appended after dependency resolution.
    #[serde(default)]
    pub extra_resources: Vec<String>,
    /// CSV of pre-resolved archive paths.
    pub library_archives: Option<String>,
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
    /// Overrides `<apps base>/<application id>` as the staging location.
    pub application_path: Option<String>,
    /// Component names the job references directly.
    #[serde(default)]
    pub components: Vec<String>,
    pub storage_agent: Option<StorageAgentConfig>,
    pub container_opts: Option<ContainerOptsConfigurator>,
    #[serde(default)]
    pub launch: LaunchAttributes,
}

/// Values the launcher computes and stamps back onto the descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LaunchAttributes {
    pub application_id: Option<ApplicationId>,
    /// Staged library archives (CSV of store locations).
    pub library_archives: Option<String>,
    pub archives: Option<String>,
    pub files: Option<String>,
    pub application_path: Option<String>,
}

/// Where the running job persists operator checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageAgentConfig {
    /// Asynchronous writes to the shared store.
    AsyncFs { path: String },
    /// Synchronous writes to the shared store.
    Fs { path: String },
}

/// Strategy for deriving per-container JVM options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerOptsConfigurator {
    Basic,
    Custom { class: String },
}

fn default_version() -> u32 {
    JOB_DESCRIPTOR_VERSION
}

fn default_master_memory_mb() -> u32 {
    1024
}

fn default_application_type() -> String {
    APPLICATION_TYPE.to_string()
}

fn default_client_timeout_ms() -> u64 {
    600_000
}

impl JobDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        JobDescriptor {
            version: JOB_DESCRIPTOR_VERSION,
            name: name.into(),
            queue: None,
            master_memory_mb: default_master_memory_mb(),
            master_jvm_options: None,
            debug: false,
            application_type: default_application_type(),
            original_app_id: None,
            archives: None,
            files: None,
            extra_resources: Vec::new(),
            library_archives: None,
            client_timeout_ms: default_client_timeout_ms(),
            application_path: None,
            components: Vec::new(),
            storage_agent: None,
            container_opts: None,
            launch: LaunchAttributes::default(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let job: JobDescriptor = toml::from_str(&content)?;
        Ok(job)
    }

    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// Structural checks that need no cluster access.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != JOB_DESCRIPTOR_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                expected: JOB_DESCRIPTOR_VERSION,
            });
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        if self.master_memory_mb == 0 {
            return Err(ConfigError::InvalidMemory);
        }
        self.original_application_id()?;
        Ok(())
    }

    /// The application this job restarts from, parsed.
    pub fn original_application_id(&self) -> Result<Option<ApplicationId>, ConfigError> {
        self.original_app_id
            .as_deref()
            .map(|original| {
                original
                    .parse::<ApplicationId>()
                    .map_err(|_| ConfigError::InvalidOriginalAppId(original.to_string()))
            })
            .transpose()
    }
}

// ── Launcher configuration ─────────────────────────────────────────

/// Client-side settings shared by every launch from this host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchConfig {
    /// Store directory holding one subdirectory per application.
    #[serde(default = "default_apps_base_dir")]
    pub apps_base_dir: String,
    #[serde(default = "default_java_cmd")]
    pub java_cmd: String,
    #[serde(default)]
    pub security_enabled: bool,
    /// Resource manager principal used as token renewer in secure mode.
    pub rm_principal: Option<String>,
    /// Overrides the default container classpath entries.
    pub application_classpath: Option<Vec<String>>,
    /// Local logging configuration shipped to the master.
    pub log_config_file: Option<PathBuf>,
    /// Explicit logger level override forwarded to the master.
    pub loggers_level: Option<String>,
    #[serde(default = "default_heap_dump_dir")]
    pub heap_dump_dir: String,
    /// Directory holding the platform archives. Falls back to
    /// `$LIFTOFF_HOME/lib`.
    pub platform_lib_dir: Option<PathBuf>,
    /// Identity propagated to the master. Falls back to `$USER`.
    pub user_name: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_apps_base_dir() -> String {
    "/user/liftoff/apps".to_string()
}

fn default_java_cmd() -> String {
    "${JAVA_HOME}/bin/java".to_string()
}

fn default_heap_dump_dir() -> String {
    "/tmp".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for LaunchConfig {
    fn default() -> Self {
        LaunchConfig {
            apps_base_dir: default_apps_base_dir(),
            java_cmd: default_java_cmd(),
            security_enabled: false,
            rm_principal: None,
            application_classpath: None,
            log_config_file: None,
            loggers_level: None,
            heap_dump_dir: default_heap_dump_dir(),
            platform_lib_dir: None,
            user_name: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl LaunchConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LaunchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn platform_lib_dir(&self) -> Option<PathBuf> {
        self.platform_lib_dir.clone().or_else(|| {
            std::env::var_os(LIFTOFF_HOME_ENV).map(|home| PathBuf::from(home).join("lib"))
        })
    }

    pub fn effective_user(&self) -> String {
        self.user_name
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "liftoff".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_job() {
        let job: JobDescriptor = toml::from_str("name = \"wordcount\"\n").unwrap();
        assert_eq!(job.name, "wordcount");
        assert_eq!(job.version, JOB_DESCRIPTOR_VERSION);
        assert_eq!(job.master_memory_mb, 1024);
        assert_eq!(job.application_type, APPLICATION_TYPE);
        assert_eq!(job.client_timeout_ms, 600_000);
        assert!(job.launch.application_id.is_none());
        job.validate().unwrap();
    }

    #[test]
    fn test_parse_full_job() {
        let toml_str = r#"
name = "wordcount"
queue = "analytics"
master_memory_mb = 8192
debug = true
components = ["com.example.WordCount", "com.example.Tokenizer"]
archives = "/opt/data/dict.zip"
library_archives = "/opt/extra/a.jar,/opt/extra/b.jar"

[storage_agent]
kind = "fs"
path = "/checkpoints/wc"
"#;
        let job: JobDescriptor = toml::from_str(toml_str).unwrap();
        assert_eq!(job.queue.as_deref(), Some("analytics"));
        assert_eq!(job.components.len(), 2);
        assert_eq!(
            job.storage_agent,
            Some(StorageAgentConfig::Fs { path: "/checkpoints/wc".to_string() })
        );
    }

    #[test]
    fn test_validate_rejects_bad_original_id() {
        let mut job = JobDescriptor::new("wc");
        job.original_app_id = Some("not-an-id".to_string());
        assert_eq!(
            job.validate(),
            Err(ConfigError::InvalidOriginalAppId("not-an-id".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_future_version() {
        let mut job = JobDescriptor::new("wc");
        job.version = 2;
        assert!(matches!(job.validate(), Err(ConfigError::UnsupportedVersion { found: 2, .. })));
    }

    #[test]
    fn test_original_application_id_is_canonical() {
        let mut job = JobDescriptor::new("wc");
        assert_eq!(job.original_application_id(), Ok(None));

        job.original_app_id = Some("application_1700000000000_42".to_string());
        let original = job.original_application_id().unwrap().unwrap();
        assert_eq!(original.to_string(), "application_1700000000000_0042");
    }

    #[test]
    fn test_launch_config_defaults_from_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liftoff.toml");
        std::fs::write(&path, "security_enabled = true\n").unwrap();

        let config = LaunchConfig::from_file(&path).unwrap();
        assert!(config.security_enabled);
        assert_eq!(config.java_cmd, "${JAVA_HOME}/bin/java");
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_effective_user_prefers_configured_name() {
        let config = LaunchConfig {
            user_name: Some("etl".to_string()),
            ..LaunchConfig::default()
        };
        assert_eq!(config.effective_user(), "etl");
    }
}
