//! Errors raised by workspace configuration and the control loop.

use thiserror::Error;

/// Errors raised by the orchestrator crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    /// A task-plan operation failed.
    #[error(transparent)]
    TaskPlan(#[from] gt_types::TaskPlanError),
    /// A job-wrapper operation failed.
    #[error(transparent)]
    Job(#[from] gt_types::JobError),
    /// The workspace config file could not be read or parsed.
    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        /// Path to the config file.
        path: String,
        /// Underlying error, rendered as a string.
        source: String,
    },
    /// The workspace config file could not be written.
    #[error("failed to write config at {path}: {source}")]
    ConfigWrite {
        /// Path to the config file.
        path: String,
        /// Underlying error, rendered as a string.
        source: String,
    },
    /// A rig name was requested that is not configured.
    #[error("unknown rig: {0}")]
    UnknownRig(String),
    /// Dispatch was requested but no rig is configured to submit work into.
    #[error("no rigs configured; run `rig add` first")]
    NoRigsConfigured,
}
