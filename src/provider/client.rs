use std::sync::Arc;

use crate::error::{CallError, ConfigurationError, LLMError, ProviderError};
use crate::validator::RequestValidator;

use super::identity::ProviderIdentity;
use super::model::{CatalogOrigin, ModelCatalog, ModelDescriptor};
use super::traits::{GenerationRequest, PoetryBackend};

const CONNECTION_TEST_PROMPT: &str = "Write a simple two-word poem.";
const CONNECTION_TEST_TOKENS: u32 = 10;

/// Uniform wrapper around one provider backend.
///
/// Every prompt goes through the [`RequestValidator`] before the backend sees
/// it, and every backend failure is attributed to this client's provider.
pub struct ProviderClient {
    identity: ProviderIdentity,
    backend: Box<dyn PoetryBackend>,
    validator: Arc<RequestValidator>,
    catalog_limit: Option<usize>,
}

impl ProviderClient {
    pub fn new(
        identity: ProviderIdentity,
        backend: Box<dyn PoetryBackend>,
        validator: Arc<RequestValidator>,
    ) -> Self {
        Self {
            identity,
            backend,
            validator,
            catalog_limit: None,
        }
    }

    /// Caps how many models [`Self::list_available_models`] returns.
    pub fn with_catalog_limit(mut self, limit: Option<usize>) -> Self {
        self.catalog_limit = limit;
        self
    }

    pub fn identity(&self) -> ProviderIdentity {
        self.identity
    }

    /// Validates the request, then asks the backend for poetry.
    pub async fn generate_poetry(
        &self,
        model: &ModelDescriptor,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, CallError> {
        if model.provider != self.identity {
            return Err(self
                .provider_error(LLMError::InvalidRequest(format!(
                    "model belongs to {}",
                    model.provider
                )))
                .into());
        }

        let checked = self.validator.validate(prompt, &model.model_id, max_tokens)?;
        let request = GenerationRequest {
            model_id: &model.model_id,
            prompt: checked.sanitized_text(),
            max_tokens,
        };
        log::debug!(
            "{} generating with {} (max_tokens={}, prompt_chars={})",
            self.identity,
            model.model_id,
            max_tokens,
            request.prompt.chars().count()
        );

        let text = self
            .backend
            .generate(&request)
            .await
            .map_err(|cause| self.provider_error(cause))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(self
                .provider_error(LLMError::ResponseFormatError {
                    message: "empty completion".to_string(),
                    raw_response: String::new(),
                })
                .into());
        }
        Ok(text.to_string())
    }

    /// Fetches a fresh catalog from the provider. Never cached.
    pub async fn list_available_models(&self) -> Result<ModelCatalog, ProviderError> {
        let raw = self
            .backend
            .list_models()
            .await
            .map_err(|cause| self.provider_error(cause))?;
        Ok(ModelCatalog::from_raw(
            self.identity,
            raw,
            CatalogOrigin::Live,
            self.catalog_limit,
        ))
    }

    /// Binds a model of this provider, producing the per-agent handle.
    pub fn bind(
        self: &Arc<Self>,
        model: ModelDescriptor,
    ) -> Result<ModelClient, ConfigurationError> {
        if model.provider != self.identity {
            return Err(ConfigurationError::InvalidSession(format!(
                "model '{}' does not belong to {}",
                model.display_name, self.identity
            )));
        }
        Ok(ModelClient {
            client: Arc::clone(self),
            model,
        })
    }

    fn provider_error(&self, cause: LLMError) -> ProviderError {
        ProviderError::new(self.identity, cause)
    }
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("identity", &self.identity)
            .field("catalog_limit", &self.catalog_limit)
            .finish()
    }
}

/// A provider client bound to one model: `generate_poetry(prompt, max_tokens)`.
#[derive(Debug, Clone)]
pub struct ModelClient {
    client: Arc<ProviderClient>,
    model: ModelDescriptor,
}

impl ModelClient {
    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub fn identity(&self) -> ProviderIdentity {
        self.client.identity()
    }

    pub async fn generate_poetry(&self, prompt: &str, max_tokens: u32) -> Result<String, CallError> {
        self.client
            .generate_poetry(&self.model, prompt, max_tokens)
            .await
    }

    /// Sends a tiny prompt; true when non-empty text comes back.
    pub async fn test_connection(&self) -> bool {
        match self
            .generate_poetry(CONNECTION_TEST_PROMPT, CONNECTION_TEST_TOKENS)
            .await
        {
            Ok(text) => !text.trim().is_empty(),
            Err(err) => {
                log::warn!("Connection test for {} failed: {err}", self.identity());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{RawModel, Vendor};
    use crate::testing::ScriptedBackend;

    fn client(backend: ScriptedBackend) -> Arc<ProviderClient> {
        Arc::new(ProviderClient::new(
            ProviderIdentity::direct(Vendor::Anthropic),
            Box::new(backend),
            Arc::new(RequestValidator::default()),
        ))
    }

    fn model(id: &str) -> ModelDescriptor {
        ModelCatalog::fallback(ProviderIdentity::direct(Vendor::Anthropic), &[id])
            .newest()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn generate_trims_backend_text() {
        let backend = ScriptedBackend::replying(["  snow on the sill  \n"]);
        let client = client(backend.clone());
        let text = client
            .generate_poetry(&model("claude-3-5-haiku-20241022"), "a poem", 50)
            .await
            .unwrap();
        assert_eq!(text, "snow on the sill");
        assert_eq!(backend.prompts(), ["a poem"]);
    }

    #[tokio::test]
    async fn validation_happens_before_the_backend() {
        let backend = ScriptedBackend::replying(["never"]);
        let client = client(backend.clone());
        let err = client
            .generate_poetry(&model("claude-3-5-haiku-20241022"), "a poem", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Validation(_)));
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn backend_failures_are_attributed_to_the_provider() {
        let backend = ScriptedBackend::failing(LLMError::AuthError("bad key".into()));
        let client = client(backend);
        let err = client
            .generate_poetry(&model("claude-3-5-haiku-20241022"), "a poem", 50)
            .await
            .unwrap_err();
        match err {
            CallError::Provider(err) => {
                assert_eq!(err.provider, ProviderIdentity::direct(Vendor::Anthropic))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_completion_is_a_provider_error() {
        let client = client(ScriptedBackend::replying(["   "]));
        let err = client
            .generate_poetry(&model("claude-3-5-haiku-20241022"), "a poem", 50)
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Provider(_)));
    }

    #[tokio::test]
    async fn foreign_models_cannot_be_bound() {
        let client = client(ScriptedBackend::replying(["x"]));
        let foreign =
            ModelCatalog::fallback(ProviderIdentity::direct(Vendor::OpenAI), &["gpt-4o"])
                .newest()
                .cloned()
                .unwrap();
        assert!(client.bind(foreign).is_err());
    }

    #[tokio::test]
    async fn connection_test_reports_success_and_failure() {
        let ok = client(ScriptedBackend::replying(["two words"]));
        let bound = ok.bind(model("claude-3-5-haiku-20241022")).unwrap();
        assert!(bound.test_connection().await);

        let failing = client(ScriptedBackend::failing(LLMError::HttpError("down".into())));
        let bound = failing.bind(model("claude-3-5-haiku-20241022")).unwrap();
        assert!(!bound.test_connection().await);
    }

    #[tokio::test]
    async fn catalog_is_live_and_formatted() {
        let backend = ScriptedBackend::replying(["x"]).with_models(vec![
            RawModel::new("claude-3-5-haiku-20241022").created_at(2),
            RawModel::new("claude-sonnet-4-20250514").created_at(5),
        ]);
        let catalog = client(backend).list_available_models().await.unwrap();
        assert!(catalog.is_live());
        assert_eq!(
            catalog.newest().unwrap().display_name,
            "Claude Sonnet 4 20250514"
        );
    }
}
