use std::fmt;

use serde::{Deserialize, Serialize};

use crate::forms::FormConstraints;
use crate::provider::{ModelDescriptor, ProviderIdentity};

/// Which of the two agents speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentSlot {
    A,
    B,
}

impl AgentSlot {
    /// Agent A speaks on even ordinals, Agent B on odd ones.
    pub const fn for_ordinal(ordinal: usize) -> Self {
        if ordinal % 2 == 0 {
            AgentSlot::A
        } else {
            AgentSlot::B
        }
    }

    pub const fn other(self) -> Self {
        match self {
            AgentSlot::A => AgentSlot::B,
            AgentSlot::B => AgentSlot::A,
        }
    }
}

impl fmt::Display for AgentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentSlot::A => f.write_str("Agent A"),
            AgentSlot::B => f.write_str("Agent B"),
        }
    }
}

/// A named agent bound to one provider model. Immutable for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub provider: ProviderIdentity,
    pub model: ModelDescriptor,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, model: ModelDescriptor) -> Self {
        Self {
            name: name.into(),
            provider: model.provider,
            model,
        }
    }
}

/// One agent's contribution. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub ordinal: usize,
    pub slot: AgentSlot,
    pub speaker: AgentConfig,
    pub text: String,
    pub form: FormConstraints,
}

/// The conversation, in order. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next turn. Ordinals must be contiguous and speakers alternate.
    pub(crate) fn append(&mut self, turn: Turn) {
        debug_assert_eq!(turn.ordinal, self.turns.len());
        debug_assert_eq!(turn.slot, AgentSlot::for_ordinal(turn.ordinal));
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn get(&self, ordinal: usize) -> Option<&Turn> {
        self.turns.get(ordinal)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
