//! Errors surfaced by the agent session, distinct from the per-component
//! error taxonomies each crate already defines.

use thiserror::Error;

/// Errors that can end an agent session before it completes normally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// No provider credentials were found in the environment.
    #[error("no provider credentials found in the environment")]
    NoProvidersConfigured,
    /// The model router has no usable model for the requested providers.
    #[error(transparent)]
    Router(#[from] gt_types::RouterError),
    /// The primary provider call and every fallback both failed.
    #[error("all providers failed: {0}")]
    AllProvidersFailed(String),
}
