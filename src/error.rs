use thiserror::Error;

use crate::dialogue::Transcript;
use crate::provider::ProviderIdentity;
use crate::validator::{redact_secrets, PatternCategory};

/// Transport-level failures of a provider backend.
#[derive(Debug, Clone, Error)]
pub enum LLMError {
    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(String),
    /// Authentication and authorization errors
    #[error("Auth error: {0}")]
    AuthError(String),
    /// The provider throttled the request
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// Invalid request parameters or format
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Errors returned by the LLM provider
    #[error("Provider error: {0}")]
    ProviderError(String),
    /// API response parsing or format error
    #[error("Response format error: {message}. Raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },
    /// The call did not finish within its time budget
    #[error("Timed out after {0} seconds")]
    Timeout(u64),
    /// JSON serialization/deserialization errors
    #[error("JSON parse error: {0}")]
    JsonError(String),
    /// Retry attempts exceeded
    #[error("Retry attempts exceeded after {attempts} tries: {last_error}")]
    RetryExceeded { attempts: usize, last_error: String },
}

/// Converts reqwest HTTP errors into LLMErrors
impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return LLMError::HttpError(format!("request timed out: {}", err.without_url()));
        }
        LLMError::HttpError(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

/// A provider call failed. Display output is redacted.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: ProviderIdentity,
    pub cause: LLMError,
}

impl ProviderError {
    pub fn new(provider: ProviderIdentity, cause: LLMError) -> Self {
        Self { provider, cause }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} request failed: {}",
            self.provider,
            redact_secrets(&self.cause.to_string())
        )
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Why the Request Validator refused a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    PromptUnsafe,
    PromptTooLong,
    InvalidModelId,
    InvalidTokenBound,
}

impl ValidationReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            ValidationReason::PromptUnsafe => "prompt_unsafe",
            ValidationReason::PromptTooLong => "prompt_too_long",
            ValidationReason::InvalidModelId => "invalid_model_id",
            ValidationReason::InvalidTokenBound => "invalid_token_bound",
        }
    }
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request rejected: {reason}")]
pub struct ValidationError {
    pub reason: ValidationReason,
    /// Pattern category that triggered an unsafe-prompt rejection.
    pub category: Option<PatternCategory>,
}

impl ValidationError {
    pub fn new(reason: ValidationReason) -> Self {
        Self {
            reason,
            category: None,
        }
    }

    pub fn unsafe_prompt(category: Option<PatternCategory>) -> Self {
        Self {
            reason: ValidationReason::PromptUnsafe,
            category,
        }
    }

    pub fn reason(&self) -> &'static str {
        self.reason.as_str()
    }
}

/// Fatal setup problems. Never retried.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("missing credential for {provider} (set {env_var})")]
    MissingCredential {
        provider: ProviderIdentity,
        env_var: &'static str,
    },
    #[error("no judge provider distinct from both agents is available")]
    NoJudgeAvailable,
    #[error("round count must be at least 1, got {0}")]
    InvalidRoundCount(u32),
    #[error("unknown poetic form '{0}'")]
    UnknownForm(String),
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("model '{model}' is not offered by {provider}")]
    UnknownModel {
        provider: ProviderIdentity,
        model: String,
    },
    #[error("{0} is not supported in this build or routing mode")]
    UnsupportedProvider(ProviderIdentity),
    #[error("invalid session configuration: {0}")]
    InvalidSession(String),
    #[error("config file error: {0}")]
    ConfigFile(String),
}

impl ConfigurationError {
    pub fn reason(&self) -> &'static str {
        match self {
            ConfigurationError::MissingCredential { .. } => "missing_credential",
            ConfigurationError::NoJudgeAvailable => "no_judge_available",
            ConfigurationError::InvalidRoundCount(_) => "invalid_round_count",
            ConfigurationError::UnknownForm(_) => "unknown_form",
            ConfigurationError::UnknownProvider(_) => "unknown_provider",
            ConfigurationError::UnknownModel { .. } => "unknown_model",
            ConfigurationError::UnsupportedProvider(_) => "unsupported_provider",
            ConfigurationError::InvalidSession(_) => "invalid_session",
            ConfigurationError::ConfigFile(_) => "config_file",
        }
    }
}

impl From<std::io::Error> for ConfigurationError {
    fn from(err: std::io::Error) -> Self {
        ConfigurationError::ConfigFile(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigurationError {
    fn from(err: toml::de::Error) -> Self {
        ConfigurationError::ConfigFile(err.to_string())
    }
}

/// Failure of one model call.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// What stopped a dialogue.
#[derive(Debug, Clone, Error)]
pub enum DialogueFailure {
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("session aborted")]
    Aborted,
    #[error("dialogue already {0}")]
    InvalidState(&'static str),
}

/// A dialogue that stopped before completion, with whatever it produced.
#[derive(Debug, Clone, Error)]
#[error("dialogue failed at turn {ordinal}: {kind}")]
pub struct DialogueError {
    pub ordinal: usize,
    pub transcript: Transcript,
    pub kind: DialogueFailure,
}

#[derive(Debug, Clone, Error)]
pub enum CritiqueError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error("revision has {found} turns, expected {expected}")]
    StructureMismatch { expected: usize, found: usize },
    #[error("revision prompt needs {needed} characters, limit is {limit}")]
    PromptBudget { needed: usize, limit: usize },
}

/// Umbrella error for the session API.
#[derive(Debug, Error)]
pub enum DuetError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Dialogue(#[from] Box<DialogueError>),
}

impl From<DialogueError> for DuetError {
    fn from(err: DialogueError) -> Self {
        DuetError::Dialogue(Box::new(err))
    }
}

impl From<CallError> for DuetError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Validation(e) => DuetError::Validation(e),
            CallError::Provider(e) => DuetError::Provider(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Vendor;

    #[test]
    fn provider_error_display_redacts_keys() {
        let err = ProviderError::new(
            ProviderIdentity::direct(Vendor::OpenAI),
            LLMError::AuthError("invalid key sk-abcdefghijklmnopqrstuvwxyz123456".into()),
        );
        let shown = err.to_string();
        assert!(shown.starts_with("OpenAI request failed"));
        assert!(!shown.contains("abcdefghijklmnopqrstuvwxyz"));
        assert!(shown.contains("[REDACTED]"));
    }

    #[test]
    fn reasons_are_stable_strings() {
        assert_eq!(
            ValidationError::new(ValidationReason::InvalidTokenBound).reason(),
            "invalid_token_bound"
        );
        assert_eq!(
            ConfigurationError::NoJudgeAvailable.reason(),
            "no_judge_available"
        );
    }
}
