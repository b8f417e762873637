#[path = "resilient/config.rs"]
mod config;

#[path = "resilient/wrapper.rs"]
mod wrapper;

pub use config::ResilienceConfig;
pub use wrapper::ResilientBackend;
