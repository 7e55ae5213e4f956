//! Completion polling for a submitted application.

use std::thread;
use std::time::{Duration, Instant};

use liftoff_core::{
    ApplicationId, ApplicationReport, ApplicationState, FinalStatus, ManagerResult,
    ResourceManager,
};
use tracing::{debug, info, warn};

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The callback asked to stop, or the application finished successfully.
    Completed,
    /// The application finished unsuccessfully, was killed, or failed.
    Unsuccessful,
    /// The timeout elapsed first. The application is left running.
    TimedOut,
}

pub struct CompletionMonitor<'a> {
    manager: &'a dyn ResourceManager,
    poll_interval: Duration,
}

impl<'a> CompletionMonitor<'a> {
    pub fn new(manager: &'a dyn ResourceManager, poll_interval: Duration) -> Self {
        Self { manager, poll_interval }
    }

    /// Poll `id` until `callback` returns true, the application reaches a
    /// terminal state, or `timeout` has passed.
    ///
    /// Each iteration sleeps first. Report errors are returned as-is.
    pub fn wait<F>(
        &self,
        id: ApplicationId,
        mut callback: F,
        timeout: Duration,
    ) -> ManagerResult<MonitorOutcome>
    where
        F: FnMut(&ApplicationReport) -> bool,
    {
        let started = Instant::now();
        loop {
            thread::sleep(self.poll_interval);

            let report = self.manager.application_report(id)?;
            if callback(&report) {
                return Ok(MonitorOutcome::Completed);
            }

            match report.state {
                ApplicationState::Finished => {
                    if report.final_status == FinalStatus::Succeeded {
                        info!(app_id = %id, "application completed successfully");
                        return Ok(MonitorOutcome::Completed);
                    }
                    info!(
                        app_id = %id,
                        state = ?report.state,
                        final_status = ?report.final_status,
                        "application finished unsuccessfully"
                    );
                    return Ok(MonitorOutcome::Unsuccessful);
                }
                ApplicationState::Killed | ApplicationState::Failed => {
                    info!(
                        app_id = %id,
                        state = ?report.state,
                        final_status = ?report.final_status,
                        "application did not finish"
                    );
                    return Ok(MonitorOutcome::Unsuccessful);
                }
                state => debug!(app_id = %id, ?state, "application still running"),
            }

            if started.elapsed() > timeout {
                warn!(app_id = %id, ?timeout, "reached client timeout");
                return Ok(MonitorOutcome::TimedOut);
            }
        }
    }
}
