//! liftoff-client — launch and restart orchestration.
//!
//! Drives one application from dependency resolution to completion against
//! a cluster [`ResourceManager`](liftoff_core::ResourceManager) and a
//! [`SharedStore`](liftoff_core::SharedStore).
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   ├── DependencyResolver (job components → ArchiveSet)
//!   ├── SubmissionBuilder
//!   │     ├── ResourceStager (archives, files, log config → app path)
//!   │     ├── CheckpointMigrator (restart only)
//!   │     │     └── RecoveryStore (recovery/snapshot, recovery/log)
//!   │     └── SubmissionDescriptor → ResourceManager::submit_application
//!   └── CompletionMonitor (poll reports until terminal or timeout)
//! ```

pub mod error;
pub mod migrate;
pub mod monitor;
pub mod orchestrator;
pub mod recovery;
pub mod submission;

pub use error::{LaunchError, LaunchResult};
pub use migrate::{CheckpointMigrator, MigrationError, MigrationResult, MigrationStep};
pub use monitor::{CompletionMonitor, MonitorOutcome};
pub use orchestrator::Orchestrator;
pub use recovery::{CheckpointSnapshot, RecoveryError, RecoveryStore};
pub use submission::SubmissionBuilder;

/// Serialized job descriptor under the application path.
pub const JOB_DESCRIPTOR_FILE: &str = "job-descriptor.json";

/// Launcher configuration under the application path.
pub const LAUNCH_CONFIG_FILE: &str = "launch-config.toml";

/// Operator checkpoints written by the storage agent.
pub const SUBDIR_CHECKPOINTS: &str = "checkpoints";
