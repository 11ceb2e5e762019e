//! The shared contract every model provider adapter implements.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::message::{CompletionResult, Message};
use crate::tool::ToolDefinition;

/// Normalizes one provider family's wire format to the shared
/// [`CompletionResult`]/[`Message`] vocabulary.
///
/// Implementations perform no retries: the step loop owns fallback
/// behavior across providers, and an adapter that errors simply
/// propagates it upward.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short provider family name (`anthropic`, `openai`, `google`), used
    /// for router provider-availability matching and logging.
    fn name(&self) -> &str;

    /// Send one completion request and return the normalized result.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        system: &str,
        max_tokens: u64,
    ) -> Result<CompletionResult, ProviderError>;
}
