//! OpenAI chat completions backend.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::LLMError;
use crate::provider::{GenerationRequest, PoetryBackend, RawModel};

use super::http::{decode, log_payload, ChatCompletion, HttpSettings, ModelList, UserMessage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

const CHAT_FAMILIES: &[&str] = &["gpt-4", "gpt-3.5", "gpt-5", "o1", "o3", "o4", "chatgpt"];
const EXCLUDED: &[&str] = &[
    "deep-research",
    "audio",
    "realtime",
    "image",
    "tts",
    "transcribe",
    "search",
    "instruct",
];

#[derive(Debug, Clone)]
pub struct OpenAI {
    settings: HttpSettings,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<UserMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Reasoning models take `max_completion_tokens` and no sampling knobs.
fn is_reasoning_model(model_id: &str) -> bool {
    ["o1", "o3", "o4"]
        .iter()
        .any(|prefix| model_id.starts_with(prefix))
}

/// Chat-capable models only; audio, image and search variants are dropped.
pub fn is_chat_model(model_id: &str) -> bool {
    CHAT_FAMILIES.iter().any(|f| model_id.starts_with(f))
        && !EXCLUDED.iter().any(|x| model_id.contains(x))
}

impl OpenAI {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }
}

#[async_trait]
impl PoetryBackend for OpenAI {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LLMError> {
        self.settings.require_key("OpenAI")?;
        let reasoning = is_reasoning_model(request.model_id);
        let body = ChatRequest {
            model: request.model_id,
            messages: UserMessage::new(request.prompt),
            max_tokens: (!reasoning).then_some(request.max_tokens),
            max_completion_tokens: reasoning.then_some(request.max_tokens),
            temperature: (!reasoning).then_some(0.7),
        };
        log_payload("OpenAI", &body);

        let response = self
            .settings
            .client
            .post(self.settings.url("v1/chat/completions"))
            .bearer_auth(self.settings.key())
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletion = decode(response, "OpenAI").await?;
        completion.into_text("OpenAI")
    }

    async fn list_models(&self) -> Result<Vec<RawModel>, LLMError> {
        self.settings.require_key("OpenAI")?;
        let response = self
            .settings
            .client
            .get(self.settings.url("v1/models"))
            .bearer_auth(self.settings.key())
            .send()
            .await?;
        let list: ModelList = decode(response, "OpenAI models").await?;
        Ok(list
            .data
            .into_iter()
            .filter(|m| is_chat_model(&m.id))
            .map(|m| RawModel {
                id: m.id,
                created: m.created,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use secrecy::SecretString;

    fn backend(server: &mockito::Server) -> OpenAI {
        OpenAI::new(HttpSettings::new(
            SecretString::new("sk-test".into()),
            server.url(),
        ))
    }

    #[rstest]
    #[case("gpt-4o", true)]
    #[case("o3-mini", true)]
    #[case("chatgpt-4o-latest", true)]
    #[case("gpt-4o-realtime-preview", false)]
    #[case("gpt-4o-mini-tts", false)]
    #[case("o3-deep-research", false)]
    #[case("text-embedding-3-large", false)]
    #[case("dall-e-3", false)]
    fn chat_filter(#[case] id: &str, #[case] keep: bool) {
        assert_eq!(is_chat_model(id), keep);
    }

    #[tokio::test]
    async fn reasoning_models_use_completion_token_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "o3-mini",
                "max_completion_tokens": 50
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ice, then"}}]}"#)
            .create_async()
            .await;

        let text = backend(&server)
            .generate(&GenerationRequest {
                model_id: "o3-mini",
                prompt: "a poem",
                max_tokens: 50,
            })
            .await
            .unwrap();
        assert_eq!(text, "ice, then");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn standard_models_use_max_tokens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o",
                "max_tokens": 300
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"river"}}]}"#)
            .create_async()
            .await;

        backend(&server)
            .generate(&GenerationRequest {
                model_id: "gpt-4o",
                prompt: "a poem",
                max_tokens: 300,
            })
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limits_are_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let err = backend(&server)
            .generate(&GenerationRequest {
                model_id: "gpt-4o",
                prompt: "a poem",
                max_tokens: 300,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::RateLimited(_)));
    }

    #[tokio::test]
    async fn catalog_is_filtered_to_chat_models() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/models")
            .with_status(200)
            .with_body(
                r#"{"data":[
                    {"id":"gpt-4o","created":1715367049},
                    {"id":"whisper-1","created":1677532384},
                    {"id":"gpt-4o-audio-preview","created":1727460443}
                ]}"#,
            )
            .create_async()
            .await;

        let models = backend(&server).list_models().await.unwrap();
        assert_eq!(models, vec![RawModel::new("gpt-4o").created_at(1715367049)]);
    }
}
