#![deny(missing_docs)]
//! OpenAI chat completions provider adapter.

mod error;
mod mapping;

use async_trait::async_trait;
use gt_types::{CompletionResult, Message, ProviderAdapter, ProviderError, ToolDefinition};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::{from_api_response, to_api_request};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Client for the OpenAI chat completions API.
pub struct OpenAi {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAi {
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

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAi {
    fn name(&self) -> &str {
        "openai"
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

        tracing::debug!(url = %self.completions_url(), model = %model, "sending completion request");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
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
    fn completions_url_includes_path() {
        let client = OpenAi::new("test-key").base_url("http://localhost:9999");
        assert_eq!(client.completions_url(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn provider_name_is_openai() {
        assert_eq!(OpenAi::new("test-key").name(), "openai");
    }
}
