#![deny(missing_docs)]
//! Google Gemini `generateContent` provider adapter.

mod error;
mod mapping;

use async_trait::async_trait;
use gt_types::{CompletionResult, Message, ProviderAdapter, ProviderError, ToolDefinition};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::{from_api_response, to_api_request};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini `generateContent` REST API.
pub struct Gemini {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl Gemini {
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

    fn generate_content_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent?key={}",
            self.base_url, self.api_key
        )
    }
}

#[async_trait]
impl ProviderAdapter for Gemini {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        system: &str,
        max_tokens: u64,
    ) -> Result<CompletionResult, ProviderError> {
        let body = to_api_request(messages, tools, system, max_tokens);
        let url = self.generate_content_url(model);

        tracing::debug!(model = %model, "sending completion request");

        let response = self
            .client
            .post(&url)
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
    fn generate_content_url_includes_model_and_key() {
        let client = Gemini::new("secret-key").base_url("http://localhost:9999");
        let url = client.generate_content_url("gemini-2.0-flash");
        assert!(url.contains("gemini-2.0-flash:generateContent"));
        assert!(url.contains("key=secret-key"));
    }

    #[test]
    fn provider_name_is_google() {
        assert_eq!(Gemini::new("k").name(), "google");
    }
}
