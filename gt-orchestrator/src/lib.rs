#![deny(missing_docs)]
//! Multi-worker control loop for the coding-agent orchestrator.
//!
//! A single in-memory job-id → task-text map tracks active workers; the
//! control loop reconciles their status against an external job service
//! and dispatches new work from a markdown task plan. The CLI surface
//! (`gastown` binary) additionally exposes workspace/rig/convoy management
//! commands that don't belong on the hot reconcile/dispatch path.

mod config;
mod control_loop;
mod error;

pub use config::{init_workspace, WorkspaceConfig};
pub use control_loop::{ControlLoop, TickReport};
pub use error::OrchestratorError;

use gt_job::{JobWrapper, JobWrapperConfig};
use gt_taskplan::TaskPlanStore;
use gt_types::{JobStatus, TaskStatus};

/// Status counts for the task plan, used by `convoy status` — the plan
/// file is the only persisted record of a task bundle's progress.
#[derive(Debug, Clone, Default)]
pub struct ConvoyStatus {
    /// Total task lines in the plan.
    pub total: usize,
    /// Tasks not yet started.
    pub pending: usize,
    /// Tasks currently dispatched to a worker.
    pub running: usize,
    /// Tasks marked done.
    pub done: usize,
}

/// Add a named rig (a name → repo URL mapping) to the workspace config.
/// Does not clone the repository — cloning is an external collaborator.
pub async fn rig_add(config: &mut WorkspaceConfig, name: &str, repo: &str) -> Result<(), OrchestratorError> {
    config.rigs.insert(name.to_string(), repo.to_string());
    config.save().await
}

/// List configured rigs as `(name, repo)` pairs, sorted by name.
pub fn rig_list(config: &WorkspaceConfig) -> Vec<(String, String)> {
    let mut rigs: Vec<(String, String)> = config
        .rigs
        .iter()
        .map(|(name, repo)| (name.clone(), repo.clone()))
        .collect();
    rigs.sort_by(|a, b| a.0.cmp(&b.0));
    rigs
}

/// Submit a single task directly to the job wrapper, bypassing the task
/// plan, into the named rig's working directory.
pub async fn spawn_single(
    config: &WorkspaceConfig,
    rig: &str,
    task: &str,
    context_files: &[String],
) -> Result<JobStatus, OrchestratorError> {
    if !config.rigs.contains_key(rig) {
        return Err(OrchestratorError::UnknownRig(rig.to_string()));
    }
    let job_wrapper = JobWrapper::new(
        config.default_agent.clone(),
        JobWrapperConfig {
            poll_interval_secs: config.poll_interval,
            rate_limit_backoff_secs: config.rate_limit_backoff,
        },
    );
    let repo_path = config.rig_path(rig);
    Ok(job_wrapper
        .submit(task, &repo_path.to_string_lossy(), context_files)
        .await?)
}

/// Create a convoy (a named bundle of tasks) by writing a fresh task plan
/// with one execution step per issue, matching `TaskPlanStore::create_task`.
pub async fn convoy_create(config: &WorkspaceConfig, name: &str, issues: &[String]) -> Result<(), OrchestratorError> {
    let store = TaskPlanStore::open(config.task_plan_path()).await?;
    store.create_task(name, issues).await?;
    Ok(())
}

/// Summarize the task plan's progress for `convoy status`.
pub async fn convoy_status(config: &WorkspaceConfig) -> Result<ConvoyStatus, OrchestratorError> {
    let store = TaskPlanStore::open(config.task_plan_path()).await?;
    let entries = store.read_entries().await?;
    let mut status = ConvoyStatus {
        total: entries.len(),
        ..Default::default()
    };
    for entry in entries {
        match entry.status {
            TaskStatus::Pending => status.pending += 1,
            TaskStatus::Running => status.running += 1,
            TaskStatus::Done => status.done += 1,
        }
    }
    Ok(status)
}

/// Poll a job's current status directly, outside the control loop.
pub async fn job_status(config: &WorkspaceConfig, job_id: &str) -> Result<JobStatus, OrchestratorError> {
    let job_wrapper = JobWrapper::new(
        config.default_agent.clone(),
        JobWrapperConfig {
            poll_interval_secs: config.poll_interval,
            rate_limit_backoff_secs: config.rate_limit_backoff,
        },
    );
    Ok(job_wrapper.poll(job_id).await?)
}

/// Check out a job's branch locally via `git worktree add`, into
/// `<rig>-checkout-<branch>` next to the rig's clone. Returns the
/// checkout path. Git itself is the named external collaborator; this
/// only shells out to it.
pub async fn checkout_pr(config: &WorkspaceConfig, rig: &str, job_id: &str) -> Result<std::path::PathBuf, OrchestratorError> {
    let status = job_status(config, job_id).await?;
    let branch = status
        .branch_name
        .ok_or_else(|| OrchestratorError::UnknownRig(format!("job {job_id} has no associated branch yet")))?;

    let repo_path = config.rig_path(rig);
    let checkout_path = config.workspace.join("rigs").join(format!("{rig}-checkout-{branch}"));

    let output = tokio::process::Command::new("git")
        .arg("worktree")
        .arg("add")
        .arg(&checkout_path)
        .arg(&branch)
        .current_dir(&repo_path)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => Ok(checkout_path),
        Ok(out) => Err(OrchestratorError::ConfigWrite {
            path: checkout_path.display().to_string(),
            source: String::from_utf8_lossy(&out.stderr).into_owned(),
        }),
        Err(e) => Err(OrchestratorError::ConfigWrite {
            path: checkout_path.display().to_string(),
            source: e.to_string(),
        }),
    }
}
