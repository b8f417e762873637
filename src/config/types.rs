use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::critique::CritiqueSettings;
use crate::dialogue::DialogueSettings;
use crate::error::ConfigurationError;
use crate::provider::{ProviderIdentity, Vendor};
use crate::registry::{CatalogLimits, Credentials, ProviderRegistry, ProviderRegistryBuilder};
use crate::resilient::ResilienceConfig;
use crate::validator::{RequestValidator, ValidationLimits};

const DEFAULT_LOG_ROTATE_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_LOG_ROTATE_KEEP: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub turn_max_tokens: u32,
    pub title_max_tokens: u32,
    pub critique_max_tokens: u32,
    pub revision_max_tokens: u32,
    pub context_char_budget: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            turn_max_tokens: 300,
            title_max_tokens: 20,
            critique_max_tokens: 800,
            revision_max_tokens: 1_200,
            context_char_budget: 6_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub direct_limit: usize,
    pub gateway_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let limits = CatalogLimits::default();
        Self {
            direct_limit: limits.direct,
            gateway_limit: limits.gateway,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub gateway_fallback: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            gateway_fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub path: Option<String>,
    pub rotate_size: u64,
    pub rotate_keep: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            path: None,
            rotate_size: DEFAULT_LOG_ROTATE_SIZE,
            rotate_keep: DEFAULT_LOG_ROTATE_KEEP,
        }
    }
}

/// Per-provider default model overrides, keyed by provider name.
///
/// ```toml
/// [models.direct]
/// anthropic = "claude-3-7-sonnet-20250219"
///
/// [models.gateway]
/// meta = "meta-llama/llama-3.3-70b-instruct"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub direct: BTreeMap<String, String>,
    pub gateway: BTreeMap<String, String>,
}

impl ModelsConfig {
    pub fn overrides(&self) -> Result<Vec<(ProviderIdentity, String)>, ConfigurationError> {
        let direct = self.direct.iter().map(|(name, model)| {
            let vendor: Vendor = name.parse()?;
            Ok((ProviderIdentity::direct(vendor), model.clone()))
        });
        let gateway = self.gateway.iter().map(|(name, model)| {
            let vendor: Vendor = name.parse()?;
            Ok((ProviderIdentity::gateway(vendor), model.clone()))
        });
        direct.chain(gateway).collect()
    }
}

/// Contents of `config.toml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub resilience: ResilienceConfig,
    pub validation: ValidationLimits,
    pub catalog: CatalogConfig,
    pub judge: JudgeConfig,
    pub logging: LoggingConfig,
    pub models: ModelsConfig,
}

impl AppConfig {
    pub fn dialogue_settings(&self, generate_title: bool) -> DialogueSettings {
        DialogueSettings {
            turn_max_tokens: self.generation.turn_max_tokens,
            title_max_tokens: self.generation.title_max_tokens,
            context_char_budget: self.generation.context_char_budget,
            generate_title,
        }
    }

    pub fn critique_settings(&self) -> CritiqueSettings {
        CritiqueSettings {
            critique_max_tokens: self.generation.critique_max_tokens,
            revision_max_tokens: self.generation.revision_max_tokens,
            turn_max_tokens: self.generation.turn_max_tokens,
            max_prompt_chars: self.validation.max_prompt_chars,
            max_tokens: self.validation.max_tokens,
            gateway_fallback: self.judge.gateway_fallback,
        }
    }

    /// A registry builder carrying this configuration. The caller may still
    /// swap the backend factory before building.
    pub fn registry_builder(
        &self,
        credentials: Credentials,
    ) -> Result<ProviderRegistryBuilder, ConfigurationError> {
        let mut builder = ProviderRegistry::builder()
            .credentials(credentials)
            .validator(RequestValidator::with_limits(self.validation))
            .resilience(self.resilience.clone())
            .catalog_limits(CatalogLimits {
                direct: self.catalog.direct_limit,
                gateway: self.catalog.gateway_limit,
            });
        for (identity, model) in self.models.overrides()? {
            builder = builder.default_model(identity, model);
        }
        Ok(builder)
    }
}
