use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};

use crate::error::LLMError;
use crate::provider::{GenerationRequest, PoetryBackend, RawModel};

use super::config::ResilienceConfig;

/// Backend wrapper that bounds each attempt in time and retries transient
/// failures with exponential backoff.
pub struct ResilientBackend {
    inner: Box<dyn PoetryBackend>,
    cfg: ResilienceConfig,
}

impl ResilientBackend {
    pub fn new(inner: Box<dyn PoetryBackend>, cfg: ResilienceConfig) -> Self {
        Self { inner, cfg }
    }

    async fn retry<F, Fut, T>(&self, what: &str, mut op: F) -> Result<T, LLMError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LLMError>>,
    {
        let attempts = self.cfg.max_attempts.max(1);
        let mut last_err = None;

        for idx in 0..attempts {
            match self.attempt(op()).await {
                Ok(value) => return Ok(value),
                Err(err) if !Self::is_retryable(&err) => return Err(err),
                Err(err) => {
                    if idx + 1 < attempts {
                        let delay = self.cfg.delay_ms(idx);
                        log::warn!(
                            "{what} attempt {}/{attempts} failed ({err}), retrying in {delay}ms",
                            idx + 1
                        );
                        sleep(Duration::from_millis(delay)).await;
                    }
                    last_err = Some(err);
                }
            }
        }

        Err(LLMError::RetryExceeded {
            attempts,
            last_error: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn attempt<T>(
        &self,
        fut: impl Future<Output = Result<T, LLMError>>,
    ) -> Result<T, LLMError> {
        match timeout(Duration::from_secs(self.cfg.timeout_secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(LLMError::Timeout(self.cfg.timeout_secs)),
        }
    }

    fn is_retryable(err: &LLMError) -> bool {
        match err {
            LLMError::HttpError(_) => true,
            LLMError::RateLimited(_) => true,
            LLMError::Timeout(_) => true,
            LLMError::ProviderError(_) => true,
            LLMError::ResponseFormatError { .. } => true,
            LLMError::JsonError(_) => true,
            LLMError::RetryExceeded { .. } => false,
            LLMError::AuthError(_) => false,
            LLMError::InvalidRequest(_) => false,
        }
    }
}

#[async_trait]
impl PoetryBackend for ResilientBackend {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LLMError> {
        self.retry("generate", || self.inner.generate(request)).await
    }

    async fn list_models(&self) -> Result<Vec<RawModel>, LLMError> {
        self.retry("list_models", || self.inner.list_models()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBackend;

    fn fast() -> ResilienceConfig {
        ResilienceConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
            timeout_secs: 5,
        }
    }

    fn request() -> GenerationRequest<'static> {
        GenerationRequest {
            model_id: "gpt-4o",
            prompt: "a poem",
            max_tokens: 20,
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let backend = ScriptedBackend::sequence(vec![
            Err(LLMError::RateLimited("slow down".into())),
            Err(LLMError::HttpError("reset".into())),
            Ok("third time".into()),
        ]);
        let resilient = ResilientBackend::new(Box::new(backend.clone()), fast());
        assert_eq!(resilient.generate(&request()).await.unwrap(), "third time");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn auth_errors_fail_fast() {
        let backend = ScriptedBackend::failing(LLMError::AuthError("bad key".into()));
        let resilient = ResilientBackend::new(Box::new(backend.clone()), fast());
        let err = resilient.generate(&request()).await.unwrap_err();
        assert!(matches!(err, LLMError::AuthError(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts() {
        let backend = ScriptedBackend::failing(LLMError::HttpError("down".into()));
        let resilient = ResilientBackend::new(Box::new(backend.clone()), fast());
        match resilient.generate(&request()).await.unwrap_err() {
            LLMError::RetryExceeded {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.calls(), 3);
    }

    struct Stalled;

    #[async_trait]
    impl PoetryBackend for Stalled {
        async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, LLMError> {
            sleep(Duration::from_secs(3600)).await;
            Ok("late".into())
        }

        async fn list_models(&self) -> Result<Vec<RawModel>, LLMError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_attempts_time_out() {
        let cfg = ResilienceConfig {
            max_attempts: 1,
            ..fast()
        };
        let resilient = ResilientBackend::new(Box::new(Stalled), cfg);
        match resilient.generate(&request()).await.unwrap_err() {
            LLMError::RetryExceeded { last_error, .. } => {
                assert!(last_error.contains("Timed out after 5 seconds"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
