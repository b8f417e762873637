use super::types::AgentSlot;

/// Orchestration state: `Idle → AwaitingTurn(A) → AwaitingTurn(B) → … → Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingTurn(AgentSlot),
    Complete,
}

impl DialogueState {
    /// State after a session starts.
    pub fn started() -> Self {
        DialogueState::AwaitingTurn(AgentSlot::A)
    }

    /// State after `completed` turns have been committed out of `total`.
    pub fn after_turn(self, completed: usize, total: usize) -> Self {
        match self {
            DialogueState::AwaitingTurn(slot) if completed < total => {
                DialogueState::AwaitingTurn(slot.other())
            }
            DialogueState::AwaitingTurn(_) => DialogueState::Complete,
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DialogueState::Idle => "idle",
            DialogueState::AwaitingTurn(_) => "running",
            DialogueState::Complete => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn walks_through_two_rounds() {
        let total = 4;
        let mut state = DialogueState::started();
        let mut seen = Vec::new();
        for completed in 1..=total {
            if let DialogueState::AwaitingTurn(slot) = state {
                seen.push(slot);
            }
            state = state.after_turn(completed, total);
        }
        assert_eq!(
            seen,
            [AgentSlot::A, AgentSlot::B, AgentSlot::A, AgentSlot::B]
        );
        assert_eq!(state, DialogueState::Complete);
    }

    proptest! {
        #[test]
        fn any_round_count_alternates_starting_with_a(rounds in 1usize..40) {
            let total = 2 * rounds;
            let mut state = DialogueState::started();
            let mut seen = Vec::new();
            while let DialogueState::AwaitingTurn(slot) = state {
                seen.push(slot);
                state = state.after_turn(seen.len(), total);
            }
            prop_assert_eq!(seen.len(), total);
            for (ordinal, slot) in seen.iter().enumerate() {
                let expected = if ordinal % 2 == 0 { AgentSlot::A } else { AgentSlot::B };
                prop_assert_eq!(*slot, expected);
            }
            prop_assert_eq!(state, DialogueState::Complete);
        }
    }

    #[test]
    fn terminal_states_are_sticky() {
        assert_eq!(
            DialogueState::Complete.after_turn(9, 2),
            DialogueState::Complete
        );
        assert_eq!(DialogueState::Idle.after_turn(0, 2), DialogueState::Idle);
    }
}
