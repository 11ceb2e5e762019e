//! The orchestrator's reconcile/dispatch/sleep control loop.

use std::collections::HashMap;
use std::time::Duration;

use gt_job::{JobWrapper, JobWrapperConfig};
use gt_taskplan::TaskPlanStore;
use gt_types::{JobState, TaskStatus};

use crate::config::WorkspaceConfig;
use crate::error::OrchestratorError;

/// Outcome of a single control-loop tick, for logging and tests.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Jobs that reconciled to `done` this tick.
    pub completed: Vec<String>,
    /// Jobs that reconciled back to `pending` this tick (failed/cancelled).
    pub reverted: Vec<String>,
    /// A task newly dispatched this tick, if dispatch capacity allowed it.
    pub dispatched: Option<String>,
    /// Number of jobs still active after this tick.
    pub active_count: usize,
}

/// Drives one workspace's set of active jobs against its task plan.
///
/// State is a job-id → task-display-text map representing currently
/// running workers; this is the only in-memory state the control loop
/// keeps.
pub struct ControlLoop {
    config: WorkspaceConfig,
    task_plan: TaskPlanStore,
    job_wrapper: JobWrapper,
    active: HashMap<String, String>,
}

impl ControlLoop {
    /// Build a control loop for the given workspace configuration,
    /// opening (and lazily creating) its task plan file.
    pub async fn new(config: WorkspaceConfig) -> Result<Self, OrchestratorError> {
        let task_plan = TaskPlanStore::open(config.task_plan_path()).await?;
        let job_wrapper = JobWrapper::new(
            config.default_agent.clone(),
            JobWrapperConfig {
                poll_interval_secs: config.poll_interval,
                rate_limit_backoff_secs: config.rate_limit_backoff,
            },
        );
        Ok(Self {
            config,
            task_plan,
            job_wrapper,
            active: HashMap::new(),
        })
    }

    /// Currently active job ids and the task text each is working on.
    pub fn active_jobs(&self) -> &HashMap<String, String> {
        &self.active
    }

    /// Run reconcile then dispatch once.
    pub async fn tick(&mut self) -> Result<TickReport, OrchestratorError> {
        let mut report = self.reconcile().await?;
        report.dispatched = self.dispatch().await?;
        report.active_count = self.active.len();
        Ok(report)
    }

    /// Poll every active job concurrently (fan-out → join) and update the
    /// task plan for any that reached a terminal state.
    async fn reconcile(&mut self) -> Result<TickReport, OrchestratorError> {
        let job_ids: Vec<String> = self.active.keys().cloned().collect();
        let polls = futures::future::join_all(job_ids.iter().map(|id| self.job_wrapper.poll(id))).await;

        let mut report = TickReport::default();
        for (job_id, result) in job_ids.into_iter().zip(polls) {
            match result {
                Ok(status) => match status.state {
                    JobState::Completed => {
                        if let Some(task) = self.active.remove(&job_id) {
                            self.task_plan.mark(&task, TaskStatus::Done).await?;
                            report.completed.push(job_id);
                        }
                    }
                    JobState::Failed | JobState::Cancelled => {
                        if let Some(task) = self.active.remove(&job_id) {
                            self.task_plan.mark(&task, TaskStatus::Pending).await?;
                            report.reverted.push(job_id);
                        }
                    }
                    JobState::Pending | JobState::Running | JobState::RateLimited => {}
                },
                Err(e) => {
                    tracing::warn!(job_id, error = %e, "reconcile poll failed, leaving job active");
                }
            }
        }
        Ok(report)
    }

    /// If there's spare capacity, submit the first pending task that isn't
    /// already running, into the first configured rig.
    async fn dispatch(&mut self) -> Result<Option<String>, OrchestratorError> {
        if self.active.len() >= self.config.max_concurrent_agents {
            return Ok(None);
        }

        let entries = self.task_plan.read_entries().await?;
        let Some(entry) = entries
            .into_iter()
            .find(|e| e.is_pending() && !self.active.values().any(|t| t == &e.display_text))
        else {
            return Ok(None);
        };
        let task_text = entry.display_text;

        let repo_path = self
            .config
            .rigs
            .keys()
            .next()
            .map(|name| self.config.rig_path(name))
            .ok_or(OrchestratorError::NoRigsConfigured)?;

        self.task_plan.mark(&task_text, TaskStatus::Running).await?;

        match self
            .job_wrapper
            .submit(&task_text, &repo_path.to_string_lossy(), &[])
            .await
        {
            Ok(status) => {
                self.active.insert(status.job_id.clone(), task_text.clone());
                Ok(Some(task_text))
            }
            Err(e) => {
                tracing::warn!(task = %task_text, error = %e, "submit failed, reverting to pending");
                self.task_plan.mark(&task_text, TaskStatus::Pending).await?;
                Ok(None)
            }
        }
    }

    /// Run the control loop forever, ticking once per configured poll
    /// interval until a shutdown signal (Ctrl-C) arrives.
    pub async fn run_forever(mut self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_interval));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "control loop tick failed");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received, exiting control loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_requires_a_configured_rig() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkspaceConfig::new(dir.path().to_path_buf());
        config.save().await.unwrap();
        let mut control = ControlLoop::new(config).await.unwrap();
        let err = control.dispatch().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NoRigsConfigured));
    }

    #[tokio::test]
    async fn dispatch_skips_when_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkspaceConfig::new(dir.path().to_path_buf());
        config.max_concurrent_agents = 0;
        config.rigs.insert("demo".to_string(), "https://example.com/demo.git".to_string());
        config.save().await.unwrap();
        let mut control = ControlLoop::new(config).await.unwrap();
        let dispatched = control.dispatch().await.unwrap();
        assert!(dispatched.is_none());
    }
}
