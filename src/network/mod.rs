//! Network Layer
//!
//! WebSocket transport, connection bookkeeping and session coordination.
//! Every game rule lives in `game/`; this layer only decides who hears what
//! and when.

pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use protocol::{ClientMessage, Role, ServerMessage, RESTART_NOTICE};
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, SendError};
pub use server::{ConfigError, GameServer, GameServerError, ServerConfig};
pub use session::{SessionConfig, SessionCoordinator, SessionError, TimerHandle};
