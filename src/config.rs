//! Application configuration file and inbound session configuration.

#[path = "config/paths.rs"]
mod paths;

#[path = "config/types.rs"]
mod types;

#[path = "config/session.rs"]
mod session;

#[path = "config/load.rs"]
mod load;

pub use load::{load_config, secure_file_permissions, LoadedConfig};
pub use paths::ConfigPaths;
pub use session::{AgentSpec, SessionConfig};
pub use types::{
    AppConfig, CatalogConfig, GenerationConfig, JudgeConfig, LoggingConfig, ModelsConfig,
};
