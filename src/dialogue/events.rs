//! Dialogue events for front ends following a session live.

use serde::Serialize;

/// Events emitted during a dialogue session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DialogueEvent {
    /// The dialogue has started.
    Started { theme: String, total_turns: usize },

    /// Agent A's model produced a title.
    TitleGenerated { title: String },

    /// A turn is about to be requested.
    TurnStarted { ordinal: usize, speaker: String },

    /// A turn was appended to the transcript.
    TurnCompleted {
        ordinal: usize,
        speaker: String,
        text: String,
    },

    /// Every turn has been produced.
    Completed { turns: usize },

    /// The turn at `ordinal` failed or was aborted.
    Failed { ordinal: usize, message: String },
}
