use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigurationError;
use crate::provider::{ProviderIdentity, RoutingMode, Vendor};

const ENV_VARS: [&str; 4] = [
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
    "OPENROUTER_API_KEY",
];

/// Environment variable holding the key for `identity`, if it has one.
pub fn credential_env(identity: ProviderIdentity) -> Option<&'static str> {
    match (identity.routing, identity.vendor) {
        (RoutingMode::Gateway, _) => Some("OPENROUTER_API_KEY"),
        (RoutingMode::Direct, Vendor::Anthropic) => Some("ANTHROPIC_API_KEY"),
        (RoutingMode::Direct, Vendor::Google) => Some("GEMINI_API_KEY"),
        (RoutingMode::Direct, Vendor::OpenAI) => Some("OPENAI_API_KEY"),
        (RoutingMode::Direct, _) => None,
    }
}

/// Provider API keys, keyed by their environment variable name.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    secrets: HashMap<String, SecretString>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the known key variables from the process environment.
    pub fn from_env() -> Self {
        let mut creds = Self::new();
        creds.overlay_env();
        creds
    }

    /// Loads a JSON `{ "VAR": "value" }` secrets file, then lets the
    /// environment override it. A missing file is not an error.
    pub fn from_file_and_env(path: &Path) -> io::Result<Self> {
        let mut creds = Self::new();
        match fs::read_to_string(path) {
            Ok(contents) => {
                let secrets: HashMap<String, String> = serde_json::from_str(&contents)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
                for (key, value) in secrets {
                    creds = creds.with(key, value);
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        creds.overlay_env();
        Ok(creds)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value: String = value.into();
        if !value.trim().is_empty() {
            self.secrets
                .insert(key.into(), SecretString::new(value.trim().to_string()));
        }
        self
    }

    fn overlay_env(&mut self) {
        for var in ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    self.secrets
                        .insert(var.to_string(), SecretString::new(value.trim().to_string()));
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&SecretString> {
        self.secrets
            .get(key)
            .filter(|secret| !secret.expose_secret().is_empty())
    }

    pub fn has_credential(&self, identity: ProviderIdentity) -> bool {
        credential_env(identity).is_some_and(|var| self.get(var).is_some())
    }

    /// The key for `identity`, or the configuration error explaining its absence.
    pub fn for_identity(&self, identity: ProviderIdentity) -> Result<&SecretString, ConfigurationError> {
        let env_var =
            credential_env(identity).ok_or(ConfigurationError::UnsupportedProvider(identity))?;
        self.get(env_var)
            .ok_or(ConfigurationError::MissingCredential {
                provider: identity,
                env_var,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn gateway_identities_share_one_key() {
        let creds = Credentials::new().with("OPENROUTER_API_KEY", "or");
        assert!(creds.has_credential(ProviderIdentity::gateway(Vendor::Meta)));
        assert!(creds.has_credential(ProviderIdentity::gateway(Vendor::Anthropic)));
        assert!(!creds.has_credential(ProviderIdentity::direct(Vendor::Anthropic)));
    }

    #[test]
    fn missing_key_names_the_variable() {
        let err = Credentials::new()
            .for_identity(ProviderIdentity::direct(Vendor::Google))
            .unwrap_err();
        assert_eq!(err.reason(), "missing_credential");
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn direct_only_vendors_are_unsupported() {
        let err = Credentials::new()
            .with("OPENROUTER_API_KEY", "or")
            .for_identity(ProviderIdentity::direct(Vendor::Mistral))
            .unwrap_err();
        assert_eq!(err.reason(), "unsupported_provider");
    }

    #[test]
    fn blank_values_are_ignored() {
        let creds = Credentials::new().with("OPENAI_API_KEY", "   ");
        assert!(!creds.has_credential(ProviderIdentity::direct(Vendor::OpenAI)));
    }

    #[test]
    fn secrets_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ANTHROPIC_API_KEY": "from-file"}}"#).unwrap();
        let creds = Credentials::from_file_and_env(file.path()).unwrap();
        assert!(creds.has_credential(ProviderIdentity::direct(Vendor::Anthropic)));
    }

    #[test]
    fn absent_secrets_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Credentials::from_file_and_env(&dir.path().join("nope.json")).is_ok());
    }

    #[test]
    fn malformed_secrets_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Credentials::from_file_and_env(file.path()).is_err());
    }
}
