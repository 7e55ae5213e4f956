//! Lifecycle of one application: launch, watch, kill.

use std::time::Duration;

use liftoff_core::{
    APPLICATION_TYPE, ApplicationId, ApplicationReport, JobDescriptor, LaunchConfig,
    ResourceManager, SharedStore,
};
use liftoff_resolve::{DependencyResolver, Registry, mandatory_components};
use tracing::{info, warn};

use crate::error::{LaunchError, LaunchResult};
use crate::monitor::{CompletionMonitor, MonitorOutcome};
use crate::submission::SubmissionBuilder;

/// Used until a launch supplies the job's own timeout.
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(600);

/// Owns the resource manager and store handles for a single application.
pub struct Orchestrator<R, S> {
    manager: R,
    store: S,
    config: LaunchConfig,
    registry: Registry,
    application_id: Option<ApplicationId>,
    client_timeout: Duration,
    started: bool,
}

impl<R: ResourceManager, S: SharedStore> Orchestrator<R, S> {
    pub fn new(manager: R, store: S, config: LaunchConfig, registry: Registry) -> Self {
        Self {
            manager,
            store,
            config,
            registry,
            application_id: None,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            started: false,
        }
    }

    pub fn start(&mut self) -> LaunchResult<()> {
        self.manager.start()?;
        self.started = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.started {
            self.manager.stop();
            self.started = false;
        }
    }

    /// Resolve, stage and submit `job`. Launch results are stamped onto
    /// `job.launch`.
    pub fn start_application(&mut self, job: &mut JobDescriptor) -> LaunchResult<ApplicationId> {
        if job.application_type != APPLICATION_TYPE {
            return Err(LaunchError::InvalidApplicationType(job.application_type.clone()));
        }
        if !self.started {
            return Err(LaunchError::NotStarted);
        }
        job.validate()?;

        let mandatory = mandatory_components(self.config.security_enabled);
        let mut archives = DependencyResolver::new(&self.registry).resolve(job, &mandatory)?;
        archives.extend(job.extra_resources.iter().cloned());

        let metrics = self.manager.cluster_metrics()?;
        info!(node_managers = metrics.node_managers, "got cluster metrics");
        for queue in self.manager.queue_acls()? {
            for acl in &queue.user_acls {
                info!(queue = %queue.queue_name, user_acl = ?acl, "user ACL for queue");
            }
        }

        let builder = SubmissionBuilder::new(&self.manager, &self.store, &self.config);
        let descriptor = builder.build(job, &archives)?;
        let app_id = descriptor.application_id;
        self.application_id = Some(app_id);
        self.client_timeout = Duration::from_millis(job.client_timeout_ms);

        builder.submit(&descriptor)?;
        info!(%app_id, "application submitted");
        Ok(app_id)
    }

    /// Wait for the launched application. True only when it completed
    /// successfully within the job's client timeout.
    pub fn monitor_application(&self) -> LaunchResult<bool> {
        let app_id = self.application_id.ok_or(LaunchError::NotStarted)?;
        let monitor = CompletionMonitor::new(
            &self.manager,
            Duration::from_millis(self.config.poll_interval_ms),
        );

        let outcome = monitor.wait(
            app_id,
            |report| {
                info!(
                    %app_id,
                    host = ?report.host,
                    queue = %report.queue,
                    rpc_port = ?report.rpc_port,
                    start_time = report.start_time,
                    state = ?report.state,
                    final_status = ?report.final_status,
                    tracking_url = ?report.tracking_url,
                    user = %report.user,
                    diagnostics = %report.diagnostics,
                    "got application report"
                );
                false
            },
            self.client_timeout,
        )?;

        if outcome == MonitorOutcome::TimedOut {
            warn!(%app_id, "application still running after client timeout");
        }
        Ok(outcome == MonitorOutcome::Completed)
    }

    pub fn application_report(&self) -> LaunchResult<ApplicationReport> {
        let app_id = self.application_id.ok_or(LaunchError::NotStarted)?;
        Ok(self.manager.application_report(app_id)?)
    }

    pub fn kill_application(&self) -> LaunchResult<()> {
        let app_id = self.application_id.ok_or(LaunchError::NotStarted)?;
        info!(%app_id, "killing application");
        Ok(self.manager.kill_application(app_id)?)
    }

    pub fn application_id(&self) -> Option<ApplicationId> {
        self.application_id
    }

    /// Override the timeout the next [`monitor_application`](Self::monitor_application) uses.
    pub fn set_client_timeout(&mut self, timeout: Duration) {
        self.client_timeout = timeout;
    }

    pub fn manager(&self) -> &R {
        &self.manager
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
