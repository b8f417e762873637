//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::provider::{GenerationRequest, PoetryBackend, RawModel};

use super::http::{decode, log_payload, HttpSettings};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GENERATE_METHOD: &str = "generateContent";

#[derive(Debug, Clone)]
pub struct Google {
    settings: HttpSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl Google {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }
}

#[async_trait]
impl PoetryBackend for Google {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LLMError> {
        self.settings.require_key("Gemini")?;
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart {
                    text: request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: 0.7,
                top_p: 0.8,
                top_k: 40,
            },
        };
        log_payload("Gemini", &body);

        let url = self.settings.url(&format!(
            "v1beta/models/{}:{GENERATE_METHOD}",
            request.model_id
        ));
        let response = self
            .settings
            .client
            .post(url)
            .header("x-goog-api-key", self.settings.key())
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateContentResponse = decode(response, "Gemini").await?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LLMError::ResponseFormatError {
                message: "Gemini response contained no candidates".into(),
                raw_response: String::new(),
            })
    }

    async fn list_models(&self) -> Result<Vec<RawModel>, LLMError> {
        self.settings.require_key("Gemini")?;
        let response = self
            .settings
            .client
            .get(self.settings.url("v1beta/models"))
            .query(&[("pageSize", "200")])
            .header("x-goog-api-key", self.settings.key())
            .send()
            .await?;
        let parsed: ModelsResponse = decode(response, "Gemini models").await?;
        Ok(parsed
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_METHOD)
            })
            .map(|m| {
                let id = m.name.strip_prefix("models/").unwrap_or(&m.name);
                RawModel::new(id)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn backend(server: &mockito::Server) -> Google {
        Google::new(HttpSettings::new(
            SecretString::new("gem-key".into()),
            server.url(),
        ))
    }

    #[tokio::test]
    async fn generate_concatenates_candidate_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "gem-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "generationConfig": {"maxOutputTokens": 120}
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"pale "},{"text":"moon"}]}}]}"#,
            )
            .create_async()
            .await;

        let text = backend(&server)
            .generate(&GenerationRequest {
                model_id: "gemini-2.5-flash",
                prompt: "a poem",
                max_tokens: 120,
            })
            .await
            .unwrap();
        assert_eq!(text, "pale moon");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_candidates_are_a_format_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let err = backend(&server)
            .generate(&GenerationRequest {
                model_id: "gemini-2.5-flash",
                prompt: "a poem",
                max_tokens: 120,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::ResponseFormatError { .. }));
    }

    #[tokio::test]
    async fn catalog_keeps_generate_content_models_only() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1beta/models")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"models":[
                    {"name":"models/gemini-2.5-flash","supportedGenerationMethods":["generateContent","countTokens"]},
                    {"name":"models/text-embedding-004","supportedGenerationMethods":["embedContent"]}
                ]}"#,
            )
            .create_async()
            .await;

        let models = backend(&server).list_models().await.unwrap();
        assert_eq!(models, vec![RawModel::new("gemini-2.5-flash")]);
    }
}
