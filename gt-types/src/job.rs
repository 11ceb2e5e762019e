//! Job status types reported by the external job wrapper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Submitted, not yet picked up by the worker.
    Pending,
    /// Actively being worked.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// The external service is throttling submissions or polls.
    RateLimited,
    /// Cancelled before completion, by request.
    Cancelled,
}

impl JobState {
    /// Whether this state is terminal (no further transitions expected).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// Point-in-time status of one dispatched job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Id assigned by the external worker CLI at submit time.
    pub job_id: String,
    /// Current lifecycle state.
    pub state: JobState,
    /// Free-text description of what the worker is currently doing.
    #[serde(default)]
    pub current_step: String,
    /// Link to the pull request opened by the worker, once available.
    #[serde(default)]
    pub pr_link: Option<String>,
    /// Name of the branch the worker is pushing to, if known.
    #[serde(default)]
    pub branch_name: Option<String>,
    /// When the job was submitted.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Error detail, set when `state` is `failed`.
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatus {
    /// Build a freshly-submitted job status.
    pub fn pending(job_id: impl Into<String>, branch_name: Option<String>) -> Self {
        Self {
            job_id: job_id.into(),
            state: JobState::Pending,
            current_step: "Initializing".to_string(),
            pr_link: None,
            branch_name,
            started_at: Some(Utc::now()),
            completed_at: None,
            error: None,
        }
    }

    /// Whether this job has reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_correct() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::RateLimited.is_terminal());
    }

    #[test]
    fn pending_status_has_no_completion_time() {
        let status = JobStatus::pending("job-1", Some("polecat-abc123".to_string()));
        assert!(status.started_at.is_some());
        assert!(status.completed_at.is_none());
        assert!(!status.is_complete());
    }
}
