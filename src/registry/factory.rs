use crate::error::ConfigurationError;
use crate::provider::{PoetryBackend, ProviderIdentity};

use super::credentials::Credentials;

/// Seam between the registry and concrete backends.
pub trait BackendFactory: Send + Sync {
    fn build(
        &self,
        identity: ProviderIdentity,
        credentials: &Credentials,
    ) -> Result<Box<dyn PoetryBackend>, ConfigurationError>;
}

/// Builds the HTTP backends compiled into this crate.
#[derive(Debug, Clone, Default)]
pub struct HttpBackendFactory {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends every backend to `base_url` instead of the provider's host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[cfg(any(
        feature = "anthropic",
        feature = "google",
        feature = "openai",
        feature = "openrouter"
    ))]
    fn settings(
        &self,
        key: &secrecy::SecretString,
        default_url: &str,
    ) -> crate::backends::HttpSettings {
        crate::backends::HttpSettings::with_client(
            self.client.clone(),
            key.clone(),
            self.base_url.as_deref().unwrap_or(default_url),
        )
    }
}

impl BackendFactory for HttpBackendFactory {
    fn build(
        &self,
        identity: ProviderIdentity,
        credentials: &Credentials,
    ) -> Result<Box<dyn PoetryBackend>, ConfigurationError> {
        use crate::provider::{RoutingMode, Vendor};
        #[allow(unused_variables)]
        let key = credentials.for_identity(identity)?;

        match (identity.routing, identity.vendor) {
            #[cfg(feature = "openrouter")]
            (RoutingMode::Gateway, _) => {
                use crate::backends::openrouter::{OpenRouter, DEFAULT_BASE_URL};
                Ok(Box::new(OpenRouter::new(self.settings(key, DEFAULT_BASE_URL))))
            }
            #[cfg(feature = "anthropic")]
            (RoutingMode::Direct, Vendor::Anthropic) => {
                use crate::backends::anthropic::{Anthropic, DEFAULT_BASE_URL};
                Ok(Box::new(Anthropic::new(self.settings(key, DEFAULT_BASE_URL))))
            }
            #[cfg(feature = "google")]
            (RoutingMode::Direct, Vendor::Google) => {
                use crate::backends::google::{Google, DEFAULT_BASE_URL};
                Ok(Box::new(Google::new(self.settings(key, DEFAULT_BASE_URL))))
            }
            #[cfg(feature = "openai")]
            (RoutingMode::Direct, Vendor::OpenAI) => {
                use crate::backends::openai::{OpenAI, DEFAULT_BASE_URL};
                Ok(Box::new(OpenAI::new(self.settings(key, DEFAULT_BASE_URL))))
            }
            _ => Err(ConfigurationError::UnsupportedProvider(identity)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Vendor;

    #[test]
    fn builds_backends_for_credentialed_identities() {
        let creds = Credentials::new()
            .with("ANTHROPIC_API_KEY", "a")
            .with("OPENROUTER_API_KEY", "o");
        let factory = HttpBackendFactory::new();
        assert!(factory
            .build(ProviderIdentity::direct(Vendor::Anthropic), &creds)
            .is_ok());
        assert!(factory
            .build(ProviderIdentity::gateway(Vendor::DeepSeek), &creds)
            .is_ok());
    }

    #[test]
    fn missing_credentials_fail_at_construction() {
        let err = HttpBackendFactory::new()
            .build(ProviderIdentity::direct(Vendor::OpenAI), &Credentials::new())
            .err()
            .unwrap();
        assert_eq!(err.reason(), "missing_credential");
    }
}
