//! Connection Registry
//!
//! At most one live connection per role. A connection is represented by the
//! sending half of its outbound queue; the socket writer task owns the other
//! half and closes the socket once every sender is gone.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::network::protocol::{Role, ServerMessage};
use crate::network::session::SessionError;

/// Unique connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.simple().to_string();
        f.write_str(&s[..8])
    }
}

/// Delivery failure for a single recipient.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    /// The peer is gone. Expected whenever a client disconnects.
    #[error("connection closed")]
    Closed,

    /// The outbound queue is full; the peer is not keeping up.
    #[error("outbound queue full")]
    Full,
}

/// Handle to a live connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
}

impl ConnectionHandle {
    /// Wrap the outbound queue of a new connection.
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            sender,
        }
    }

    /// Connection identifier.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message without waiting.
    pub fn send(&self, message: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Closed(_) => SendError::Closed,
            TrySendError::Full(_) => SendError::Full,
        })
    }
}

/// Role -> connection map.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<Role, ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a role for a connection.
    ///
    /// If the role is taken, the new connection gets an error notice and is
    /// dropped (which closes it). The existing connection is left alone.
    pub fn attempt_attach(&mut self, role: Role, handle: ConnectionHandle) -> Result<(), SessionError> {
        if self.connections.contains_key(&role) {
            let notice = ServerMessage::error(format!("Role {role} is already taken."));
            log_send_result(role, handle.id(), handle.send(notice));
            return Err(SessionError::RoleOccupied(role));
        }

        debug!("Attached {} as {}", handle.id(), role);
        self.connections.insert(role, handle);
        Ok(())
    }

    /// Release a role. No-op if it is free.
    pub fn detach(&mut self, role: Role) -> Option<ConnectionHandle> {
        self.connections.remove(&role)
    }

    /// Connection holding a role.
    pub fn get(&self, role: Role) -> Option<&ConnectionHandle> {
        self.connections.get(&role)
    }

    /// Whether a role is held.
    pub fn is_attached(&self, role: Role) -> bool {
        self.connections.contains_key(&role)
    }

    /// Whether both roles are held.
    pub fn both_attached(&self) -> bool {
        Role::ALL.iter().all(|role| self.is_attached(*role))
    }

    /// Number of attached connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is attached.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send to one role if attached. Failures are logged, not returned.
    pub fn send_to(&self, role: Role, message: ServerMessage) {
        if let Some(handle) = self.connections.get(&role) {
            log_send_result(role, handle.id(), handle.send(message));
        }
    }

    /// Send to every attached connection. One failed recipient never stops
    /// delivery to the others.
    pub fn broadcast(&self, message: &ServerMessage) {
        for (role, handle) in &self.connections {
            log_send_result(*role, handle.id(), handle.send(message.clone()));
        }
    }
}

fn log_send_result(role: Role, id: ConnectionId, result: Result<(), SendError>) {
    match result {
        Ok(()) => {}
        Err(SendError::Closed) => debug!("Dropped message for {} ({}): connection closed", role, id),
        Err(SendError::Full) => warn!("Dropped message for {} ({}): outbound queue full", role, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(capacity: usize) -> (ConnectionHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ConnectionHandle::new(tx), rx)
    }

    #[test]
    fn test_attach_and_get() {
        let mut registry = ConnectionRegistry::new();
        let (hacker, _rx) = handle(4);
        let id = hacker.id();

        registry.attempt_attach(Role::Hacker, hacker).unwrap();
        assert_eq!(registry.get(Role::Hacker).map(|h| h.id()), Some(id));
        assert!(registry.get(Role::Spy).is_none());
        assert!(!registry.both_attached());
    }

    #[test]
    fn test_role_conflict_keeps_first() {
        let mut registry = ConnectionRegistry::new();
        let (first, mut first_rx) = handle(4);
        let first_id = first.id();
        let (second, mut second_rx) = handle(4);

        registry.attempt_attach(Role::Hacker, first).unwrap();
        let result = registry.attempt_attach(Role::Hacker, second);
        assert!(matches!(result, Err(SessionError::RoleOccupied(Role::Hacker))));

        assert_eq!(registry.get(Role::Hacker).map(|h| h.id()), Some(first_id));
        assert!(matches!(second_rx.try_recv(), Ok(ServerMessage::Error { .. })));
        // Rejected handle was dropped, so its queue is closed.
        assert!(matches!(
            second_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let (spy, _rx) = handle(4);
        registry.attempt_attach(Role::Spy, spy).unwrap();

        assert!(registry.detach(Role::Spy).is_some());
        assert!(registry.detach(Role::Spy).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_broadcast_survives_closed_peer() {
        let mut registry = ConnectionRegistry::new();
        let (hacker, hacker_rx) = handle(4);
        let (spy, mut spy_rx) = handle(4);
        registry.attempt_attach(Role::Hacker, hacker).unwrap();
        registry.attempt_attach(Role::Spy, spy).unwrap();
        drop(hacker_rx);

        registry.broadcast(&ServerMessage::Timer { time: 10 });
        assert_eq!(spy_rx.try_recv().unwrap(), ServerMessage::Timer { time: 10 });
    }

    #[test]
    fn test_broadcast_survives_full_queue() {
        let mut registry = ConnectionRegistry::new();
        let (hacker, mut hacker_rx) = handle(1);
        let (spy, mut spy_rx) = handle(4);
        registry.attempt_attach(Role::Hacker, hacker).unwrap();
        registry.attempt_attach(Role::Spy, spy).unwrap();

        registry.broadcast(&ServerMessage::Timer { time: 2 });
        registry.broadcast(&ServerMessage::Timer { time: 1 });

        assert_eq!(hacker_rx.try_recv().unwrap(), ServerMessage::Timer { time: 2 });
        assert!(hacker_rx.try_recv().is_err());
        assert_eq!(spy_rx.try_recv().unwrap(), ServerMessage::Timer { time: 2 });
        assert_eq!(spy_rx.try_recv().unwrap(), ServerMessage::Timer { time: 1 });
    }

    #[test]
    fn test_send_to_absent_role_is_noop() {
        let registry = ConnectionRegistry::new();
        registry.send_to(Role::Spy, ServerMessage::info("nobody home"));
    }
}
