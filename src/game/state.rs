//! Game State Definitions
//!
//! The single authoritative progress record shared by both players.
//! Only the session coordinator mutates it, always through `transition`.

use serde::{Deserialize, Serialize};

use crate::game::catalog::Catalog;
use crate::{DEFAULT_LIVES, DEFAULT_TIME_BUDGET_SECS};

// =============================================================================
// RULES
// =============================================================================

/// Starting values for a game. Scoring constants live in the crate root.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameRules {
    /// Seconds on the clock at the start of a game.
    pub time_budget_secs: u32,
    /// Wrong answers allowed before the game is lost.
    pub initial_lives: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            initial_lives: DEFAULT_LIVES,
        }
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Every node was breached.
    Victory,
    /// Ran out of lives.
    DefeatLives,
    /// Clock reached zero.
    DefeatTimeout,
}

impl Outcome {
    /// Status text reported for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Victory => "victory",
            Outcome::DefeatLives => "defeat-lives",
            Outcome::DefeatTimeout => "defeat-timeout",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Mutable game progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Index into the catalog. Equal to the catalog length once cleared.
    pub current_node: usize,

    /// Puzzles solved in the current node since entering it.
    pub node_progress: u32,

    /// Accumulated score, never negative.
    pub score: u32,

    /// Remaining lives.
    pub lives: u32,

    /// Seconds left on the clock.
    pub time_remaining: u32,

    /// Set once the game is over.
    pub outcome: Option<Outcome>,
}

impl GameState {
    /// Fresh state for the given rules.
    pub fn new(rules: &GameRules) -> Self {
        Self {
            current_node: 0,
            node_progress: 0,
            score: 0,
            lives: rules.initial_lives,
            time_remaining: rules.time_budget_secs,
            outcome: None,
        }
    }

    /// Reset in place to the starting values.
    pub fn reset(&mut self, rules: &GameRules) {
        *self = Self::new(rules);
    }

    /// Whether the game has ended.
    #[inline]
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Terminal status text, empty while the game is running.
    pub fn status_text(&self) -> &'static str {
        self.outcome.map(Outcome::as_str).unwrap_or("")
    }

    /// Check the range invariants and that the outcome agrees with the
    /// counters that produced it.
    pub fn invariants_hold(&self, catalog: &Catalog) -> bool {
        if self.current_node > catalog.len() {
            return false;
        }

        if let Some(node) = catalog.node(self.current_node) {
            if self.node_progress > node.required_successes {
                return false;
            }
        }

        match self.outcome {
            Some(Outcome::Victory) => self.current_node == catalog.len(),
            Some(Outcome::DefeatLives) => self.lives == 0,
            Some(Outcome::DefeatTimeout) => self.time_remaining == 0,
            None => self.current_node < catalog.len() && self.lives > 0,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(&GameRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let rules = GameRules { time_budget_secs: 45, initial_lives: 5 };
        let state = GameState::new(&rules);
        assert_eq!(state.time_remaining, 45);
        assert_eq!(state.lives, 5);
        assert_eq!(state.score, 0);
        assert!(!state.is_over());
        assert_eq!(state.status_text(), "");
    }

    #[test]
    fn test_reset_restores_starting_values() {
        let rules = GameRules::default();
        let mut state = GameState::new(&rules);
        state.current_node = 2;
        state.score = 700;
        state.lives = 1;
        state.outcome = Some(Outcome::DefeatLives);

        state.reset(&rules);
        assert_eq!(state, GameState::new(&rules));
    }

    #[test]
    fn test_status_text() {
        let mut state = GameState::default();
        state.outcome = Some(Outcome::DefeatTimeout);
        assert_eq!(state.status_text(), "defeat-timeout");
        assert_eq!(Outcome::Victory.to_string(), "victory");
    }

    #[test]
    fn test_invariants_detect_inconsistent_outcome() {
        let catalog = Catalog::builtin();
        let mut state = GameState::default();
        assert!(state.invariants_hold(&catalog));

        state.outcome = Some(Outcome::Victory);
        assert!(!state.invariants_hold(&catalog));

        state.current_node = catalog.len();
        assert!(state.invariants_hold(&catalog));
    }
}
