use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// LLM vendors known to the orchestrator.
///
/// Anthropic, Google and OpenAI are reachable both directly and through the
/// gateway; the rest only exist as gateway namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Anthropic,
    Google,
    OpenAI,
    Meta,
    Mistral,
    DeepSeek,
}

impl Vendor {
    /// Vendors with a dedicated direct-mode backend.
    pub const DIRECT: [Vendor; 3] = [Vendor::Anthropic, Vendor::Google, Vendor::OpenAI];

    /// Every vendor, in judge priority order.
    pub const ALL: [Vendor; 6] = [
        Vendor::Google,
        Vendor::Anthropic,
        Vendor::OpenAI,
        Vendor::Meta,
        Vendor::Mistral,
        Vendor::DeepSeek,
    ];

    /// Namespace prefix the gateway uses in model ids, e.g. `anthropic/…`.
    pub const fn namespace(self) -> &'static str {
        match self {
            Vendor::Anthropic => "anthropic",
            Vendor::Google => "google",
            Vendor::OpenAI => "openai",
            Vendor::Meta => "meta-llama",
            Vendor::Mistral => "mistralai",
            Vendor::DeepSeek => "deepseek",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Vendor::Anthropic => "Anthropic",
            Vendor::Google => "Google",
            Vendor::OpenAI => "OpenAI",
            Vendor::Meta => "Meta",
            Vendor::Mistral => "Mistral",
            Vendor::DeepSeek => "DeepSeek",
        }
    }

    pub fn supports_direct(self) -> bool {
        Self::DIRECT.contains(&self)
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.namespace().eq_ignore_ascii_case(namespace))
    }

    /// Vendor implied by a gateway model id's namespace prefix.
    pub fn from_model_id(model_id: &str) -> Option<Self> {
        let (namespace, _) = model_id.split_once('/')?;
        Self::from_namespace(namespace)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Vendor {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Vendor::Anthropic),
            "google" | "gemini" => Ok(Vendor::Google),
            "openai" | "gpt" => Ok(Vendor::OpenAI),
            "meta" | "meta-llama" | "llama" => Ok(Vendor::Meta),
            "mistral" | "mistralai" => Ok(Vendor::Mistral),
            "deepseek" => Ok(Vendor::DeepSeek),
            _ => Err(ConfigurationError::UnknownProvider(s.trim().to_string())),
        }
    }
}

/// How requests reach a vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// The vendor's own API and credential.
    #[default]
    Direct,
    /// One shared gateway endpoint, vendor selected by model-id namespace.
    Gateway,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Direct => f.write_str("direct"),
            RoutingMode::Gateway => f.write_str("gateway"),
        }
    }
}

impl FromStr for RoutingMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(RoutingMode::Direct),
            "gateway" | "openrouter" => Ok(RoutingMode::Gateway),
            other => Err(ConfigurationError::InvalidSession(format!(
                "unknown routing mode '{other}'"
            ))),
        }
    }
}

/// A vendor plus the route used to reach it. Immutable once an agent is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderIdentity {
    pub vendor: Vendor,
    pub routing: RoutingMode,
}

impl ProviderIdentity {
    pub const fn new(vendor: Vendor, routing: RoutingMode) -> Self {
        Self { vendor, routing }
    }

    pub const fn direct(vendor: Vendor) -> Self {
        Self::new(vendor, RoutingMode::Direct)
    }

    pub const fn gateway(vendor: Vendor) -> Self {
        Self::new(vendor, RoutingMode::Gateway)
    }

    pub fn is_gateway(&self) -> bool {
        self.routing == RoutingMode::Gateway
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.routing {
            RoutingMode::Direct => write!(f, "{}", self.vendor),
            RoutingMode::Gateway => write!(f, "OpenRouter/{}", self.vendor.namespace()),
        }
    }
}
