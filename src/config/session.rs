use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::forms::FormConstraints;
use crate::provider::{ProviderIdentity, RoutingMode, Vendor};

fn default_true() -> bool {
    true
}

/// One agent as the user described it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgentSpec {
    pub name: String,
    pub provider: String,
    /// Display name or exact model id; the provider's named default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Inbound configuration for one session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    pub theme: String,
    pub form: String,
    /// Unit count for forms whose length is chosen per session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    pub rounds: u32,
    #[serde(default)]
    pub routing: RoutingMode,
    #[serde(default = "default_true")]
    pub title: bool,
    pub agent_a: AgentSpec,
    pub agent_b: AgentSpec,
}

impl SessionConfig {
    pub fn new(
        theme: impl Into<String>,
        form: impl Into<String>,
        rounds: u32,
        agent_a: AgentSpec,
        agent_b: AgentSpec,
    ) -> Self {
        Self {
            theme: theme.into(),
            form: form.into(),
            length: None,
            rounds,
            routing: RoutingMode::Direct,
            title: true,
            agent_a,
            agent_b,
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Re-checks everything the front end may have let through and returns
    /// the session's form constraints.
    pub fn validate(&self) -> Result<FormConstraints, ConfigurationError> {
        if self.rounds < 1 {
            return Err(ConfigurationError::InvalidRoundCount(self.rounds));
        }
        if self.theme.trim().is_empty() {
            return Err(ConfigurationError::InvalidSession("theme is empty".into()));
        }
        for spec in [&self.agent_a, &self.agent_b] {
            if spec.name.trim().is_empty() {
                return Err(ConfigurationError::InvalidSession(
                    "agent name is empty".into(),
                ));
            }
            self.identity(spec)?;
        }
        FormConstraints::lookup(&self.form, self.length)
    }

    /// Provider identity of `spec` under this session's routing mode.
    pub fn identity(&self, spec: &AgentSpec) -> Result<ProviderIdentity, ConfigurationError> {
        let vendor: Vendor = spec.provider.parse()?;
        let identity = ProviderIdentity::new(vendor, self.routing);
        if self.routing == RoutingMode::Direct && !vendor.supports_direct() {
            return Err(ConfigurationError::UnsupportedProvider(identity));
        }
        Ok(identity)
    }
}
