#![deny(missing_docs)]
//! Anthropic Messages API provider adapter.
//!
//! Implements [`ProviderAdapter`] by translating the shared message/tool
//! vocabulary to Anthropic's wire format and back. Performs no retries —
//! fallback across providers is the step loop's responsibility.

mod error;
mod mapping;

use async_trait::async_trait;
use gt_types::{CompletionResult, Message, ProviderAdapter, ProviderError, ToolDefinition};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::{from_api_response, to_api_request};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
pub struct Anthropic {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl Anthropic {
    /// Build a client from an API key, using the default API base URL.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the API base URL, e.g. to point at a local mock server.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl ProviderAdapter for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        system: &str,
        max_tokens: u64,
    ) -> Result<CompletionResult, ProviderError> {
        let body = to_api_request(messages, tools, model, system, max_tokens);

        tracing::debug!(url = %self.messages_url(), model = %model, "sending completion request");

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let response_text = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(map_http_status(status, &response_text));
        }

        let json: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        from_api_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_set() {
        let client = Anthropic::new("test-key");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_overrides_base_url() {
        let client = Anthropic::new("test-key").base_url("http://localhost:9999");
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn messages_url_includes_path() {
        let client = Anthropic::new("test-key").base_url("http://localhost:9999");
        assert_eq!(client.messages_url(), "http://localhost:9999/v1/messages");
    }

    #[test]
    fn provider_name_is_anthropic() {
        let client = Anthropic::new("test-key");
        assert_eq!(client.name(), "anthropic");
    }
}
