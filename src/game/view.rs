//! Per-Role Views
//!
//! Projections of `GameState` for each player. Pure functions: the same
//! state, catalog and connection presence always give the same view.

use serde::{Deserialize, Serialize};

use crate::game::catalog::Catalog;
use crate::game::state::{GameState, Outcome};

/// Intel shown to the spy while the hacker is not connected.
pub const WAITING_INTEL: &str = "Waiting for the hacker to connect...";

/// Intel shown when the current node has run out of puzzles.
pub const NO_INTEL: &str = "No intel available for this node.";

// =============================================================================
// SOLVER (HACKER)
// =============================================================================

/// What the hacker sees: the current node and puzzle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverView {
    /// Current node name.
    pub node_name: String,
    /// Progress indicator, `"k/required"`.
    pub progress: String,
    /// Prompt of the current puzzle.
    pub prompt: String,
}

impl SolverView {
    /// Render as the single line pushed to the hacker terminal.
    pub fn message(&self) -> String {
        format!("[{} {}] {}", self.node_name, self.progress, self.prompt)
    }
}

/// Derive the hacker's view. `None` if the game is over or there is no
/// current puzzle.
pub fn solver_view(state: &GameState, catalog: &Catalog) -> Option<SolverView> {
    if state.is_over() {
        return None;
    }

    let node = catalog.node(state.current_node)?;
    let puzzle = node.puzzle(state.node_progress)?;

    Some(SolverView {
        node_name: node.name.clone(),
        progress: format!("{}/{}", state.node_progress, node.required_successes),
        prompt: puzzle.prompt.clone(),
    })
}

// =============================================================================
// OBSERVER (SPY)
// =============================================================================

/// Catalog entry as the spy's map renders it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Node index.
    pub id: usize,
    /// Display name.
    pub name: String,
    /// Correct answers needed to clear the node.
    pub required_hacks: u32,
}

/// Full progress view for the spy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverView {
    /// Whole catalog.
    pub map: Vec<NodeSummary>,
    /// Current node index.
    pub current_node: usize,
    /// Progress in the current node.
    pub node_progress: u32,
    /// Score.
    pub score: u32,
    /// Whether the game has ended.
    pub game_over: bool,
    /// Hint for the current puzzle, or a waiting/summary message.
    pub current_intel: String,
    /// Seconds left.
    pub time_left: u32,
    /// Lives left.
    pub lives: u32,
}

/// Derive the spy's view.
pub fn observer_view(state: &GameState, catalog: &Catalog, hacker_connected: bool) -> ObserverView {
    let map = catalog
        .nodes()
        .iter()
        .enumerate()
        .map(|(id, node)| NodeSummary {
            id,
            name: node.name.clone(),
            required_hacks: node.required_successes,
        })
        .collect();

    ObserverView {
        map,
        current_node: state.current_node,
        node_progress: state.node_progress,
        score: state.score,
        game_over: state.is_over(),
        current_intel: intel(state, catalog, hacker_connected),
        time_left: state.time_remaining,
        lives: state.lives,
    }
}

/// Intel line for the spy.
pub fn intel(state: &GameState, catalog: &Catalog, hacker_connected: bool) -> String {
    match state.outcome {
        Some(outcome) => summary(outcome, state.score),
        None if !hacker_connected => WAITING_INTEL.to_string(),
        None => catalog
            .puzzle(state.current_node, state.node_progress)
            .map(|p| p.hint.clone())
            .unwrap_or_else(|| NO_INTEL.to_string()),
    }
}

fn summary(outcome: Outcome, score: u32) -> String {
    match outcome {
        Outcome::Victory => format!("Mainframe breached. Mission complete. Final score: {score}"),
        Outcome::DefeatLives => format!("Hacker traced after too many failed attempts. Final score: {score}"),
        Outcome::DefeatTimeout => format!("Time is up, the connection was traced. Final score: {score}"),
    }
}
