//! Concrete [`PoetryBackend`](crate::provider::PoetryBackend) implementations,
//! one per provider API.

#[cfg(any(
    feature = "anthropic",
    feature = "google",
    feature = "openai",
    feature = "openrouter"
))]
#[path = "backends/http.rs"]
mod http;

#[cfg(feature = "anthropic")]
#[path = "backends/anthropic.rs"]
pub mod anthropic;

#[cfg(feature = "google")]
#[path = "backends/google.rs"]
pub mod google;

#[cfg(feature = "openai")]
#[path = "backends/openai.rs"]
pub mod openai;

#[cfg(feature = "openrouter")]
#[path = "backends/openrouter.rs"]
pub mod openrouter;

#[cfg(any(
    feature = "anthropic",
    feature = "google",
    feature = "openai",
    feature = "openrouter"
))]
pub use http::HttpSettings;
