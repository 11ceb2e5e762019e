//! Maps HTTP/reqwest errors to [`ProviderError`].

use gt_types::ProviderError;

/// Map an HTTP status code from the OpenAI API to a [`ProviderError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let truncated: String = body.chars().take(2000).collect();
    match status.as_u16() {
        401 | 403 => ProviderError::MissingCredentials(truncated),
        429 => ProviderError::RateLimited {
            retry_after_secs: None,
        },
        _ => ProviderError::Http {
            status: status.as_u16(),
            body: truncated,
        },
    }
}

/// Map a [`reqwest::Error`] to a [`ProviderError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Transport(err.to_string())
}
