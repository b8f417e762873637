//! OpenRouter gateway backend. One client serves every namespace
//! (`anthropic/...`, `meta-llama/...`) behind a single key.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::LLMError;
use crate::provider::{GenerationRequest, PoetryBackend, RawModel};

use super::http::{decode, log_payload, ChatCompletion, HttpSettings, ModelList, UserMessage};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai";
const APP_TITLE: &str = "Poetry Duet";

#[derive(Debug, Clone)]
pub struct OpenRouter {
    settings: HttpSettings,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<UserMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

impl OpenRouter {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }
}

#[async_trait]
impl PoetryBackend for OpenRouter {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LLMError> {
        self.settings.require_key("OpenRouter")?;
        let body = ChatRequest {
            model: request.model_id,
            messages: UserMessage::new(request.prompt),
            max_tokens: request.max_tokens,
            temperature: 0.7,
        };
        log_payload("OpenRouter", &body);

        let response = self
            .settings
            .client
            .post(self.settings.url("api/v1/chat/completions"))
            .bearer_auth(self.settings.key())
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletion = decode(response, "OpenRouter").await?;
        completion.into_text("OpenRouter")
    }

    async fn list_models(&self) -> Result<Vec<RawModel>, LLMError> {
        self.settings.require_key("OpenRouter")?;
        let response = self
            .settings
            .client
            .get(self.settings.url("api/v1/models"))
            .bearer_auth(self.settings.key())
            .send()
            .await?;
        let list: ModelList = decode(response, "OpenRouter models").await?;
        Ok(list
            .data
            .into_iter()
            .map(|m| RawModel {
                id: m.id,
                created: m.created,
            })
            .collect())
    }
}
