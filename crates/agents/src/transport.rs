//! OpenRouter chat-completions transport.

use async_trait::async_trait;
use papertrade_core::{LlmTransport, TransportError};
use std::time::Duration;

/// HTTP transport against an OpenRouter-compatible completions endpoint.
///
/// The per-call deadline comes from the caller; schema validation of the
/// returned document is the agents' concern.
pub struct OpenRouterTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenRouterTransport {
    #[must_use]
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl LlmTransport for OpenRouterTransport {
    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        timeout: Duration,
    ) -> Result<serde_json::Value, TransportError> {
        let payload = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": 0.1,
            "max_tokens": 500
        });

        let request = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(timeout)
            .send();

        let response = match request.await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(TransportError::Timeout(timeout)),
            Err(e) => return Err(TransportError::Network(e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| TransportError::InvalidJson("response missing content".to_string()))?;

        parse_json_reply(content)
    }
}

/// Parses a model reply as JSON, tolerating a markdown code fence around
/// the document.
pub fn parse_json_reply(content: &str) -> Result<serde_json::Value, TransportError> {
    let trimmed = content.trim();
    let body = if trimmed.starts_with("```") {
        let inner = trimmed.trim_start_matches("```");
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        inner.split("```").next().unwrap_or(inner).trim()
    } else {
        trimmed
    };

    serde_json::from_str(body).map_err(|e| TransportError::InvalidJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let value = parse_json_reply(r#"{"side": "long"}"#).unwrap();
        assert_eq!(value["side"], "long");
    }

    #[test]
    fn test_parse_fenced_json() {
        let value = parse_json_reply("```json\n{\"side\": \"long\"}\n```").unwrap();
        assert_eq!(value["side"], "long");
    }

    #[test]
    fn test_parse_fence_without_language() {
        let value = parse_json_reply("```\n{\"ok\": true}\n```").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn test_parse_prose_fails() {
        assert!(matches!(
            parse_json_reply("I think you should go long."),
            Err(TransportError::InvalidJson(_))
        ));
    }
}
