use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::ConfigurationError;
use crate::provider::{
    format_display_name, ModelCatalog, ModelDescriptor, ProviderClient, ProviderIdentity,
    RoutingMode, Vendor,
};
use crate::resilient::{ResilienceConfig, ResilientBackend};
use crate::validator::RequestValidator;

use super::credentials::Credentials;
use super::defaults::{builtin_default_model, fallback_catalog};
use super::factory::{BackendFactory, HttpBackendFactory};

/// How many entries a live catalog keeps, per routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLimits {
    pub direct: usize,
    pub gateway: usize,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            direct: 6,
            gateway: 20,
        }
    }
}

impl CatalogLimits {
    fn for_routing(&self, routing: RoutingMode) -> usize {
        match routing {
            RoutingMode::Direct => self.direct,
            RoutingMode::Gateway => self.gateway,
        }
    }
}

/// Maps provider identities to lazily constructed, process-wide clients.
///
/// Safe to share between concurrent sessions: lookups take a read lock and
/// each identity's client is constructed at most once.
pub struct ProviderRegistry {
    credentials: Credentials,
    factory: Arc<dyn BackendFactory>,
    validator: Arc<RequestValidator>,
    resilience: ResilienceConfig,
    limits: CatalogLimits,
    default_overrides: HashMap<ProviderIdentity, String>,
    clients: RwLock<HashMap<ProviderIdentity, Arc<ProviderClient>>>,
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn has_credential(&self, identity: ProviderIdentity) -> bool {
        self.credentials.has_credential(identity)
    }

    /// Direct providers that can be resolved, in priority order.
    pub fn available_direct(&self) -> Vec<Vendor> {
        Vendor::ALL
            .into_iter()
            .filter(|v| v.supports_direct())
            .filter(|v| self.has_credential(ProviderIdentity::direct(*v)))
            .collect()
    }

    pub fn gateway_available(&self) -> bool {
        self.has_credential(ProviderIdentity::gateway(Vendor::Anthropic))
    }

    /// The client for `identity`, constructing it on first use.
    pub fn resolve(
        &self,
        identity: ProviderIdentity,
    ) -> Result<Arc<ProviderClient>, ConfigurationError> {
        if let Some(client) = self.clients.read().get(&identity) {
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write();
        if let Some(client) = clients.get(&identity) {
            return Ok(Arc::clone(client));
        }

        if identity.routing == RoutingMode::Direct && !identity.vendor.supports_direct() {
            return Err(ConfigurationError::UnsupportedProvider(identity));
        }
        self.credentials.for_identity(identity)?;
        let backend = self.factory.build(identity, &self.credentials)?;
        let backend = ResilientBackend::new(backend, self.resilience.clone());
        let client = Arc::new(
            ProviderClient::new(identity, Box::new(backend), Arc::clone(&self.validator))
                .with_catalog_limit(Some(self.limits.for_routing(identity.routing))),
        );
        log::debug!("Constructed provider client for {identity}");
        clients.insert(identity, Arc::clone(&client));
        Ok(client)
    }

    /// Live catalog for `identity`, or the built-in fallback when the
    /// listing fails. Check [`ModelCatalog::is_live`] to tell them apart.
    pub async fn catalog(
        &self,
        identity: ProviderIdentity,
    ) -> Result<ModelCatalog, ConfigurationError> {
        let client = self.resolve(identity)?;
        match client.list_available_models().await {
            Ok(catalog) if !catalog.is_empty() => Ok(catalog),
            Ok(_) => {
                log::warn!("{identity} returned an empty catalog, using built-in models");
                Ok(fallback_catalog(identity))
            }
            Err(err) => {
                log::warn!("Falling back to built-in models: {err}");
                Ok(fallback_catalog(identity))
            }
        }
    }

    /// Configured default model id, or the built-in one.
    pub fn default_model(&self, identity: ProviderIdentity) -> Option<String> {
        self.default_overrides
            .get(&identity)
            .cloned()
            .or_else(|| builtin_default_model(identity).map(str::to_string))
    }

    /// Resolves a user's model choice (display name or exact id) against the
    /// catalog. `None` picks the provider's named default.
    pub async fn select_model(
        &self,
        identity: ProviderIdentity,
        requested: Option<&str>,
    ) -> Result<ModelDescriptor, ConfigurationError> {
        let catalog = self.catalog(identity).await?;
        let wanted = match requested.map(str::trim).filter(|r| !r.is_empty()) {
            Some(name) => name.to_string(),
            None => self
                .default_model(identity)
                .ok_or(ConfigurationError::UnsupportedProvider(identity))?,
        };

        if let Some(found) = catalog.find(&wanted) {
            return Ok(found.clone());
        }
        if looks_like_model_id(identity, &wanted) {
            return Ok(ModelDescriptor {
                display_name: format_display_name(&wanted),
                model_id: wanted,
                provider: identity,
                created: None,
            });
        }
        Err(ConfigurationError::UnknownModel {
            provider: identity,
            model: wanted,
        })
    }
}

/// Exact ids not in the (truncated) catalog are accepted when they have the
/// shape of an id for this provider.
fn looks_like_model_id(identity: ProviderIdentity, candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    match identity.routing {
        RoutingMode::Gateway => candidate
            .strip_prefix(identity.vendor.namespace())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|model| !model.is_empty()),
        RoutingMode::Direct => !candidate.contains('/'),
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("cached", &self.clients.read().len())
            .field("limits", &self.limits)
            .finish()
    }
}

pub struct ProviderRegistryBuilder {
    credentials: Credentials,
    factory: Option<Arc<dyn BackendFactory>>,
    validator: RequestValidator,
    resilience: ResilienceConfig,
    limits: CatalogLimits,
    default_overrides: HashMap<ProviderIdentity, String>,
}

impl Default for ProviderRegistryBuilder {
    fn default() -> Self {
        Self {
            credentials: Credentials::new(),
            factory: None,
            validator: RequestValidator::default(),
            resilience: ResilienceConfig::defaults(),
            limits: CatalogLimits::default(),
            default_overrides: HashMap::new(),
        }
    }
}

impl ProviderRegistryBuilder {
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn validator(mut self, validator: RequestValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.resilience = resilience;
        self
    }

    pub fn catalog_limits(mut self, limits: CatalogLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn default_model(mut self, identity: ProviderIdentity, model_id: impl Into<String>) -> Self {
        self.default_overrides.insert(identity, model_id.into());
        self
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            credentials: self.credentials,
            factory: self
                .factory
                .unwrap_or_else(|| Arc::new(HttpBackendFactory::new())),
            validator: Arc::new(self.validator),
            resilience: self.resilience,
            limits: self.limits,
            default_overrides: self.default_overrides,
            clients: RwLock::new(HashMap::new()),
        }
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
