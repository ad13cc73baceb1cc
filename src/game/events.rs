//! Game Events
//!
//! Events generated by state transitions. The session turns them into
//! notices for the players and log lines.

use serde::{Deserialize, Serialize};

use crate::game::state::Outcome;

/// Something that happened during a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A puzzle was solved.
    PuzzleSolved {
        node: usize,
        progress: u32,
        required: u32,
    },

    /// The current node was cleared and the next one unlocked.
    NodeBreached { node: usize },

    /// A wrong answer cost a life.
    AnswerRejected { lives_left: u32 },

    /// A wrong answer wiped the progress made in the node.
    ProgressLost { node: usize, lost: u32 },

    /// The game ended.
    GameOver { outcome: Outcome },
}

impl GameEvent {
    /// Whether this event ends the game.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::GameOver { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_event() {
        assert!(GameEvent::GameOver { outcome: Outcome::Victory }.is_terminal());
        assert!(!GameEvent::NodeBreached { node: 0 }.is_terminal());
    }
}
