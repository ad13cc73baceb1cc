//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a JSON object tagged by its `type` field.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::view::ObserverView;

// =============================================================================
// ROLES
// =============================================================================

/// The two seats in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Solver: submits answers.
    Hacker,
    /// Observer: sees hints and the full map.
    Spy,
}

impl Role {
    /// Both roles, in a fixed order.
    pub const ALL: [Role; 2] = [Role::Hacker, Role::Spy];

    /// Name used in URLs and notices.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Hacker => "hacker",
            Role::Spy => "spy",
        }
    }

    /// The other role.
    pub fn partner(self) -> Role {
        match self {
            Role::Hacker => Role::Spy,
            Role::Spy => Role::Hacker,
        }
    }

    /// Parse the role from a request path of the form `/ws/{role}`.
    pub fn from_path(path: &str) -> Option<Role> {
        path.strip_prefix("/ws/")?
            .trim_end_matches('/')
            .parse()
            .ok()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role name.
#[derive(Debug, Clone, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hacker" => Ok(Role::Hacker),
            "spy" => Ok(Role::Spy),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a new game. Accepted from either role.
    Restart,

    /// Answer typed by the hacker. Ignored from the spy.
    Command {
        /// Raw answer text. Missing means empty.
        #[serde(default)]
        message: String,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Notice broadcast when a game is restarted. The hacker terminal clears
/// its screen when it sees `REINICIANDO SISTEMA`.
pub const RESTART_NOTICE: &str = "REINICIANDO SISTEMA... new operation started.";

/// Messages sent from the server to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Neutral notice.
    Info { message: String },

    /// Good news (puzzle solved, node breached, victory).
    Success { message: String },

    /// Bad news (wrong answer, defeat, rejected connection).
    Error { message: String },

    /// Current puzzle. Hacker only.
    Puzzle { message: String },

    /// Full progress view. Spy only.
    State(ObserverView),

    /// Clock update.
    Timer { time: u32 },
}

impl ServerMessage {
    /// Info notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info { message: message.into() }
    }

    /// Success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success { message: message.into() }
    }

    /// Error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    /// Puzzle push.
    pub fn puzzle(message: impl Into<String>) -> Self {
        Self::Puzzle { message: message.into() }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
