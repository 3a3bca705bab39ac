//! Shared HTTP plumbing for the adapters

use serde::de::DeserializeOwned;

use super::error::{ProviderError, ProviderResult};

const MAX_ERROR_BODY: usize = 300;

/// Send a prepared request and decode a JSON success body
///
/// Non-success statuses are mapped through [`ProviderError::from_status`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> ProviderResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, &e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, &e))?;

    if !status.is_success() {
        return Err(ProviderError::from_status(provider, status.as_u16(), error_message(&body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(provider, format!("failed to parse response: {}", e)))
}

/// Pull a readable message out of an error body
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}` and
/// `{"message": ..}`; anything else is truncated raw text.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("error"))
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str());
        if let Some(message) = message {
            return message.to_string();
        }
    }
    truncate(body.trim(), MAX_ERROR_BODY)
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid API key","type":"auth"}}"#),
            "Invalid API key"
        );
        assert_eq!(error_message(r#"{"error":"model 'x' not found"}"#), "model 'x' not found");
        assert_eq!(error_message(r#"{"message":"Too many requests"}"#), "Too many requests");
        assert_eq!(error_message("  upstream timeout  "), "upstream timeout");
    }

    #[test]
    fn test_error_message_truncates() {
        let long = "x".repeat(1000);
        let msg = error_message(&long);
        assert_eq!(msg.len(), MAX_ERROR_BODY + 3);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://api.openai.com/v1/", "/chat/completions"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(join_url("http://localhost:11434", "api/chat"), "http://localhost:11434/api/chat");
    }
}
