use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::validator::{bounded_excerpt, redact_secrets};

const ERROR_BODY_CHARS: usize = 300;

/// Connection settings shared by every HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub api_key: SecretString,
    pub base_url: String,
    pub client: Client,
}

impl HttpSettings {
    pub fn new(api_key: SecretString, base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_key, base_url)
    }

    pub fn with_client(client: Client, api_key: SecretString, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub(crate) fn require_key(&self, provider: &str) -> Result<(), LLMError> {
        if self.key().is_empty() {
            return Err(LLMError::AuthError(format!("Missing {provider} API key")));
        }
        Ok(())
    }
}

pub(crate) fn log_payload<T: Serialize>(context: &str, body: &T) {
    if log::log_enabled!(log::Level::Trace) {
        if let Ok(json) = serde_json::to_string(body) {
            log::trace!("{context} request payload: {}", redact_secrets(&json));
        }
    }
}

/// Maps non-success statuses onto the error taxonomy and decodes the body.
pub(crate) async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, LLMError> {
    let status = response.status();
    log::debug!("{context} HTTP status: {status}");
    let text = response.text().await?;
    if !status.is_success() {
        return Err(status_error(status, context, &text));
    }
    serde_json::from_str(&text).map_err(|e| LLMError::ResponseFormatError {
        message: format!("Failed to decode {context} response: {e}"),
        raw_response: bounded_excerpt(&redact_secrets(&text), ERROR_BODY_CHARS),
    })
}

fn status_error(status: StatusCode, context: &str, body: &str) -> LLMError {
    let detail = format!(
        "{context} returned {status}: {}",
        bounded_excerpt(&redact_secrets(body), ERROR_BODY_CHARS)
    );
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LLMError::AuthError(detail),
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimited(detail),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            LLMError::InvalidRequest(detail)
        }
        _ => LLMError::ProviderError(detail),
    }
}

/// One user message, the only shape this crate ever sends.
#[derive(Serialize, Debug)]
pub(crate) struct UserMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> UserMessage<'a> {
    pub fn new(content: &'a str) -> Vec<Self> {
        vec![Self {
            role: "user",
            content,
        }]
    }
}

/// OpenAI-compatible chat completion response.
#[derive(Deserialize, Debug)]
pub(crate) struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    pub fn into_text(self, context: &str) -> Result<String, LLMError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LLMError::ResponseFormatError {
                message: format!("{context} response contained no text"),
                raw_response: String::new(),
            })
    }
}

/// `{"data": [{"id": ..., "created": ...}]}` listing used by OpenAI-style APIs.
#[derive(Deserialize, Debug)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub created: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_onto_error_kinds() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "x", "nope"),
            LLMError::AuthError(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "x", ""),
            LLMError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "x", ""),
            LLMError::ProviderError(_)
        ));
    }

    #[test]
    fn error_bodies_are_redacted() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            "OpenAI",
            "Incorrect API key provided: sk-proj-abcdefghijklmnopqrstuvwx",
        );
        assert!(!err.to_string().contains("abcdefghijklmnop"));
    }

    #[test]
    fn urls_join_cleanly() {
        let s = HttpSettings::new(SecretString::new("k".into()), "http://localhost:1234/");
        assert_eq!(s.url("/v1/models"), "http://localhost:1234/v1/models");
    }
}
