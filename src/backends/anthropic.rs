//! Anthropic Messages API backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::provider::{GenerationRequest, PoetryBackend, RawModel};

use super::http::{decode, log_payload, HttpSettings, UserMessage};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct Anthropic {
    settings: HttpSettings,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<UserMessage<'a>>,
}

#[derive(Deserialize, Debug)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize, Debug)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<AnthropicModel>,
}

#[derive(Deserialize, Debug)]
struct AnthropicModel {
    id: String,
    #[serde(default)]
    created_at: Option<String>,
}

impl Anthropic {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("x-api-key", self.settings.key())
            .header("anthropic-version", API_VERSION)
    }
}

fn parse_created(stamp: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(stamp)
        .ok()
        .map(|dt| dt.timestamp())
}

#[async_trait]
impl PoetryBackend for Anthropic {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LLMError> {
        self.settings.require_key("Anthropic")?;
        let body = MessagesRequest {
            model: request.model_id,
            max_tokens: request.max_tokens,
            temperature: TEMPERATURE,
            messages: UserMessage::new(request.prompt),
        };
        log_payload("Anthropic", &body);

        let response = self
            .authorized(self.settings.client.post(self.settings.url("v1/messages")))
            .json(&body)
            .send()
            .await?;
        let parsed: MessagesResponse = decode(response, "Anthropic").await?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(LLMError::ResponseFormatError {
                message: "Anthropic response contained no text blocks".into(),
                raw_response: String::new(),
            });
        }
        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<RawModel>, LLMError> {
        self.settings.require_key("Anthropic")?;
        let response = self
            .authorized(
                self.settings
                    .client
                    .get(self.settings.url("v1/models"))
                    .query(&[("limit", "100")]),
            )
            .send()
            .await?;
        let parsed: ModelsResponse = decode(response, "Anthropic models").await?;
        Ok(parsed
            .data
            .into_iter()
            .map(|m| RawModel {
                created: m.created_at.as_deref().and_then(parse_created),
                id: m.id,
            })
            .collect())
    }
}
