//! # Hackline Game Server
//!
//! Realtime coordinator for a two-player cooperative puzzle game: a hacker
//! types answers against the clock while a spy, who alone sees the hints,
//! talks them through it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HACKLINE SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/            - Game rules (pure, no I/O)                │
//! │  ├── catalog.rs   - Nodes and puzzles                        │
//! │  ├── answer.rs    - Answer normalization and matching        │
//! │  ├── state.rs     - Game state, rules and outcomes           │
//! │  ├── transition.rs- Answer and clock-tick transitions        │
//! │  ├── events.rs    - Events produced by transitions           │
//! │  └── view.rs      - Hacker and spy views                     │
//! │                                                              │
//! │  network/         - Networking and coordination              │
//! │  ├── protocol.rs  - JSON message types                       │
//! │  ├── registry.rs  - One connection per role                  │
//! │  ├── session.rs   - Serialized transitions, timer, pushes    │
//! │  └── server.rs    - WebSocket server and configuration       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! There is exactly one game per process. Answers, clock ticks, restarts
//! and connection changes are applied one at a time under a single lock,
//! and every view pushed to a client reflects a state that existed between
//! two transitions.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::catalog::Catalog;
pub use game::state::{GameRules, GameState, Outcome};
pub use network::protocol::{ClientMessage, Role, ServerMessage};
pub use network::server::{GameServer, ServerConfig};
pub use network::session::{SessionConfig, SessionCoordinator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds on the clock at the start of a game.
pub const DEFAULT_TIME_BUDGET_SECS: u32 = 90;

/// Wrong answers allowed per game.
pub const DEFAULT_LIVES: u32 = 3;

/// Points for each correct answer.
pub const SOLVE_POINTS: u32 = 100;

/// Extra points for clearing a node.
pub const NODE_CLEAR_BONUS: u32 = 300;

/// Seconds added to the clock for each correct answer.
pub const SOLVE_TIME_BONUS_SECS: u32 = 10;

/// Points lost on a wrong answer.
pub const MISS_PENALTY_POINTS: u32 = 50;

/// Seconds lost on a wrong answer.
pub const MISS_TIME_PENALTY_SECS: u32 = 15;

/// Pause before the next puzzle is pushed after a correct answer (ms).
pub const PUZZLE_PUSH_DELAY_MS: u64 = 1000;
