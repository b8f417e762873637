use async_trait::async_trait;

use crate::error::LLMError;

use super::model::RawModel;

/// A single, already validated generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model_id: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
}

/// Transport-level capability of one provider.
///
/// Implementations only talk to the network. Validation, retries and error
/// attribution are layered on top by [`super::ProviderClient`] and
/// [`crate::resilient::ResilientBackend`].
#[async_trait]
pub trait PoetryBackend: Send + Sync {
    /// Sends one prompt and returns the generated text.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LLMError>;

    /// Lists the model ids the provider currently serves.
    async fn list_models(&self) -> Result<Vec<RawModel>, LLMError>;
}
