#[path = "registry/credentials.rs"]
mod credentials;

#[path = "registry/defaults.rs"]
mod defaults;

#[path = "registry/factory.rs"]
mod factory;

#[path = "registry/cache.rs"]
mod cache;

pub use cache::{CatalogLimits, ProviderRegistry, ProviderRegistryBuilder};
pub use credentials::{credential_env, Credentials};
pub use defaults::{builtin_default_model, fallback_catalog, fallback_model_ids};
pub use factory::{BackendFactory, HttpBackendFactory};
