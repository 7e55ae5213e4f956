//! Cluster resource manager capability.

use thiserror::Error;

use crate::types::{
    ApplicationId, ApplicationReport, ClusterMetrics, NewApplication, QueueUserAcls,
    SubmissionDescriptor, Token,
};

/// Result type alias for resource manager calls.
pub type ManagerResult<T> = Result<T, ManagerError>;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("unknown application: {0}")]
    UnknownApplication(ApplicationId),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("resource manager unavailable: {0}")]
    Unavailable(String),
}

/// Client-side view of the cluster resource manager.
///
/// `start`/`stop` bracket the whole launch sequence. A handle is not meant
/// to be shared between two concurrent launches.
pub trait ResourceManager {
    fn start(&mut self) -> ManagerResult<()> {
        Ok(())
    }

    fn stop(&mut self) {}

    /// Reserve a fresh application id and report the cluster's largest
    /// container capability.
    fn create_application(&self) -> ManagerResult<NewApplication>;

    fn submit_application(&self, descriptor: &SubmissionDescriptor) -> ManagerResult<()>;

    fn application_report(&self, id: ApplicationId) -> ManagerResult<ApplicationReport>;

    fn kill_application(&self, id: ApplicationId) -> ManagerResult<()>;

    fn queue_acls(&self) -> ManagerResult<Vec<QueueUserAcls>>;

    fn cluster_metrics(&self) -> ManagerResult<ClusterMetrics>;

    /// A token that lets `renewer` act against the resource manager on the
    /// launched application's behalf.
    fn delegation_token(&self, renewer: &str) -> ManagerResult<Token>;
}
