//! Turn-by-turn poetic exchange between two agents.

#[path = "dialogue/types.rs"]
mod types;

#[path = "dialogue/state.rs"]
mod state;

#[path = "dialogue/prompt.rs"]
mod prompt;

#[path = "dialogue/events.rs"]
mod events;

#[path = "dialogue/orchestrator.rs"]
mod orchestrator;

pub use events::DialogueEvent;
pub use orchestrator::{
    DialogueOrchestrator, DialogueOutcome, DialoguePlan, DialogueSettings, Participant,
};
pub(crate) use prompt::ELISION_MARKER;
pub use prompt::{salient_word, PromptBuilder};
pub use state::DialogueState;
pub use types::{AgentConfig, AgentSlot, Transcript, Turn};
