//! Two-agent poetry dialogue orchestration with a provider-disjoint judge.
//!
//! The crate drives a turn-by-turn exchange between two named agents, each
//! backed by an LLM provider, then hands the finished transcript to a judge
//! chosen from a provider neither agent used. Every outbound prompt passes
//! through the [`validator::RequestValidator`] before it reaches a backend.
//!
//! Entry points:
//! - [`registry::ProviderRegistry`] resolves provider clients and catalogs.
//! - [`dialogue::DialogueOrchestrator`] produces a [`dialogue::Transcript`].
//! - [`critique::CritiquePipeline`] selects a judge, critiques and revises.
//! - [`session::run_session`] wires the three together.

pub mod backends;
pub mod config;
pub mod critique;
pub mod dialogue;
pub mod error;
pub mod forms;
pub mod provider;
pub mod registry;
pub mod resilient;
pub mod session;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{
    CallError, ConfigurationError, CritiqueError, DialogueError, DialogueFailure, DuetError,
    LLMError, ProviderError, ValidationError, ValidationReason,
};
pub use provider::{
    ModelCatalog, ModelClient, ModelDescriptor, PoetryBackend, ProviderClient, ProviderIdentity,
    RoutingMode, Vendor,
};
pub use session::{run_session, SessionOutput, SessionRunner};
