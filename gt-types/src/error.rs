//! Per-component error taxonomies.
//!
//! Each error enum is `#[non_exhaustive]` so provider crates and the agent
//! binary can add variants later without a breaking change for downstream
//! matchers.

use thiserror::Error;

/// Errors raised by the budget tracker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BudgetError {
    /// The requested spend would push total cost past the configured cap.
    #[error("budget exceeded: spent {spent}, cap {cap}, requested {requested}")]
    Exceeded {
        /// Total spend recorded so far.
        spent: rust_decimal::Decimal,
        /// Configured budget cap.
        cap: rust_decimal::Decimal,
        /// The cost of the step that was about to be recorded.
        requested: rust_decimal::Decimal,
    },
}

/// Errors raised by the model router.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouterError {
    /// No model in the catalog satisfies the request (e.g. no credentials).
    #[error("no usable model available for step type {step_type:?}")]
    NoModelAvailable {
        /// The step type that could not be routed.
        step_type: crate::model::StepType,
    },
    /// A model id was requested that is not present in the catalog.
    #[error("unknown model id: {0}")]
    UnknownModel(String),
}

/// Errors raised by provider adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// The HTTP transport failed (connection, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),
    /// The provider returned a non-2xx response.
    #[error("provider returned status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for readability.
        body: String,
    },
    /// The response body could not be decoded into the expected shape.
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    /// The provider signaled a rate limit; callers may retry after backoff.
    #[error("rate limited, retry after {retry_after_secs:?}s")]
    RateLimited {
        /// Suggested backoff in seconds, if the provider supplied one.
        retry_after_secs: Option<u64>,
    },
    /// No API key was found in the environment for this provider.
    #[error("missing credentials for provider {0}")]
    MissingCredentials(String),
}

/// Errors raised by the tool sandbox.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// The requested tool name has no registered handler.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Arguments failed to parse against the tool's expected shape.
    #[error("invalid arguments for tool {tool}: {reason}")]
    InvalidArguments {
        /// Name of the tool that rejected the arguments.
        tool: String,
        /// Human-readable reason the arguments were rejected.
        reason: String,
    },
    /// A path argument resolved outside the tool's working directory.
    #[error("path escapes working directory: {0}")]
    PathEscape(String),
    /// The tool's uniqueness precondition was not satisfied.
    #[error("{0}")]
    PreconditionFailed(String),
    /// The tool invocation exceeded its timeout.
    #[error("tool timed out after {0}s")]
    Timeout(u64),
    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(String),
}

/// Errors raised by the job wrapper.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobError {
    /// The external job CLI could not be spawned.
    #[error("failed to spawn job process: {0}")]
    Spawn(String),
    /// The job id could not be parsed from the submit command's output.
    #[error("could not parse job id from output: {0}")]
    UnparseableJobId(String),
    /// The job status could not be parsed from the poll command's output.
    #[error("could not parse job status from output: {0}")]
    UnparseableStatus(String),
    /// The job failed three consecutive polls and was marked failed.
    #[error("job {0} failed after repeated poll errors")]
    RepeatedPollFailure(String),
}

/// Errors raised by the task plan store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskPlanError {
    /// The task plan file does not exist and could not be lazily created.
    #[error("failed to read task plan at {path}: {source}")]
    Read {
        /// Path to the task plan file.
        path: String,
        /// Underlying I/O error, rendered as a string.
        source: String,
    },
    /// The task plan file could not be written back atomically.
    #[error("failed to write task plan at {path}: {source}")]
    Write {
        /// Path to the task plan file.
        path: String,
        /// Underlying I/O error, rendered as a string.
        source: String,
    },
    /// The requested task index does not exist in the plan.
    #[error("task index {0} out of range")]
    IndexOutOfRange(usize),
}
