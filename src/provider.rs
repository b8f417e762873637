#[path = "provider/identity.rs"]
mod identity;

#[path = "provider/model.rs"]
mod model;

#[path = "provider/traits.rs"]
mod traits;

#[path = "provider/client.rs"]
mod client;

pub use client::{ModelClient, ProviderClient};
pub use identity::{ProviderIdentity, RoutingMode, Vendor};
pub use model::{format_display_name, CatalogOrigin, ModelCatalog, ModelDescriptor, RawModel};
pub use traits::{GenerationRequest, PoetryBackend};
