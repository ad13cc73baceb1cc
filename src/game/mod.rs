//! Game Logic Module
//!
//! All game rules. No I/O, no clocks, no locking.
//!
//! ## Module Structure
//!
//! - `catalog`: Nodes and puzzles, built-in or loaded from JSON
//! - `answer`: Answer normalization and the correctness rule
//! - `state`: Game state, rules and outcomes
//! - `transition`: Answer and clock-tick transitions
//! - `events`: Events produced by transitions
//! - `view`: Per-role projections of the state

pub mod answer;
pub mod catalog;
pub mod events;
pub mod state;
pub mod transition;
pub mod view;

// Re-export key types
pub use catalog::{Catalog, CatalogError, Node, Puzzle};
pub use events::GameEvent;
pub use state::{GameRules, GameState, Outcome};
pub use transition::{AnswerResult, TickResult, Verdict};
pub use view::{NodeSummary, ObserverView, SolverView};
