//! Scripted backends and factories shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{ConfigurationError, LLMError};
use crate::provider::{GenerationRequest, PoetryBackend, ProviderIdentity, RawModel};
use crate::registry::{BackendFactory, Credentials};

#[derive(Default)]
struct Script {
    steps: Vec<Result<String, LLMError>>,
    cursor: usize,
    prompts: Vec<String>,
    models: Vec<RawModel>,
    model_error: Option<LLMError>,
}

/// Backend that replays canned replies in order, repeating the last one.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn sequence(steps: Vec<Result<String, LLMError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                steps,
                ..Script::default()
            })),
        }
    }

    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::sequence(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn failing(err: LLMError) -> Self {
        Self::sequence(vec![Err(err)])
    }

    pub fn with_models(self, models: Vec<RawModel>) -> Self {
        self.script.lock().models = models;
        self
    }

    pub fn with_model_error(self, err: LLMError) -> Self {
        self.script.lock().model_error = Some(err);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.script.lock().prompts.clone()
    }

    pub fn calls(&self) -> usize {
        self.script.lock().prompts.len()
    }
}

#[async_trait]
impl PoetryBackend for ScriptedBackend {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LLMError> {
        let mut script = self.script.lock();
        script.prompts.push(request.prompt.to_string());
        if script.steps.is_empty() {
            return Err(LLMError::ProviderError("script is empty".into()));
        }
        let idx = script.cursor.min(script.steps.len() - 1);
        script.cursor += 1;
        script.steps[idx].clone()
    }

    async fn list_models(&self) -> Result<Vec<RawModel>, LLMError> {
        let script = self.script.lock();
        match &script.model_error {
            Some(err) => Err(err.clone()),
            None => Ok(script.models.clone()),
        }
    }
}

/// Factory handing out [`ScriptedBackend`]s and counting constructions.
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    backends: Arc<Mutex<HashMap<ProviderIdentity, ScriptedBackend>>>,
    builds: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, identity: ProviderIdentity, backend: ScriptedBackend) -> Self {
        self.backends.lock().insert(identity, backend);
        self
    }

    pub fn backend(&self, identity: ProviderIdentity) -> Option<ScriptedBackend> {
        self.backends.lock().get(&identity).cloned()
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl BackendFactory for ScriptedFactory {
    fn build(
        &self,
        identity: ProviderIdentity,
        _credentials: &Credentials,
    ) -> Result<Box<dyn PoetryBackend>, ConfigurationError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let backend = self
            .backends
            .lock()
            .entry(identity)
            .or_insert_with(|| ScriptedBackend::replying(["default reply"]))
            .clone();
        Ok(Box::new(backend))
    }
}
