//! WebSocket Game Server
//!
//! Accepts connections on `/ws/{role}`, hands each one to the session
//! coordinator and pumps frames in both directions.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, instrument, warn};

use crate::game::catalog::{Catalog, CatalogError};
use crate::game::state::GameRules;
use crate::network::protocol::{ClientMessage, Role, ServerMessage};
use crate::network::registry::ConnectionHandle;
use crate::network::session::{SessionConfig, SessionCoordinator};
use crate::{DEFAULT_LIVES, DEFAULT_TIME_BUDGET_SECS, PUZZLE_PUSH_DELAY_MS};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default per-connection outbound queue capacity.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 64;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Game rules and pacing.
    pub session: SessionConfig,
    /// JSON catalog to load instead of the built-in one.
    pub catalog_path: Option<PathBuf>,
    /// Frames queued per connection before new ones are dropped.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            session: SessionConfig::default(),
            catalog_path: None,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    /// Environment variable name.
    pub var: &'static str,
    /// Offending value.
    pub value: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl ServerConfig {
    /// Load configuration from `HACKLINE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_var(&lookup, "HACKLINE_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))?;
        let time_budget_secs = parse_positive(&lookup, "HACKLINE_TIME_BUDGET_SECS", DEFAULT_TIME_BUDGET_SECS)?;
        let initial_lives = parse_positive(&lookup, "HACKLINE_LIVES", DEFAULT_LIVES)?;
        let puzzle_delay_ms = parse_var(&lookup, "HACKLINE_PUZZLE_DELAY_MS", PUZZLE_PUSH_DELAY_MS)?;
        let outbound_buffer = parse_positive(&lookup, "HACKLINE_OUTBOUND_BUFFER", DEFAULT_OUTBOUND_BUFFER)?;
        let catalog_path = lookup("HACKLINE_CATALOG")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind_addr,
            session: SessionConfig {
                rules: GameRules { time_budget_secs, initial_lives },
                puzzle_delay: Duration::from_millis(puzzle_delay_ms),
                ..SessionConfig::default()
            },
            catalog_path,
            outbound_buffer,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError {
            var,
            value,
            reason: "could not be parsed",
        }),
    }
}

fn parse_positive<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let parsed = parse_var(lookup, var, default)?;
    if parsed == T::default() {
        return Err(ConfigError {
            var,
            value: lookup(var).unwrap_or_default(),
            reason: "must be at least 1",
        });
    }
    Ok(parsed)
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Catalog could not be loaded.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Bad configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// The one session.
    session: Arc<SessionCoordinator>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server, loading the catalog if one is configured.
    pub fn new(config: ServerConfig) -> Result<Self, GameServerError> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                let catalog = Catalog::from_file(path)?;
                info!("Loaded catalog from {} ({} nodes)", path.display(), catalog.len());
                catalog
            }
            None => Catalog::builtin(),
        };

        let (shutdown_tx, _) = broadcast::channel(1);
        let session = SessionCoordinator::new(Arc::new(catalog), config.session.clone());

        Ok(Self {
            config,
            session,
            shutdown_tx,
        })
    }

    /// Session shared by every connection.
    pub fn session(&self) -> &Arc<SessionCoordinator> {
        &self.session
    }

    /// Bind the configured address and serve until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Game server listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Stop accepting and close every connection.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let session = self.session.clone();
        let buffer = self.config.outbound_buffer;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut role = None;
            let ws_stream = match accept_hdr_async(stream, |req: &Request, resp: Response| {
                match Role::from_path(req.uri().path()) {
                    Some(r) => {
                        role = Some(r);
                        Ok(resp)
                    }
                    None => {
                        let mut refusal = ErrorResponse::new(Some("unknown role".to_string()));
                        *refusal.status_mut() = StatusCode::NOT_FOUND;
                        Err(refusal)
                    }
                }
            })
            .await
            {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };
            let Some(role) = role else {
                return;
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer);

            // Closes the socket once every sender for this connection is gone.
            let writer = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                let _ = ws_sender.close().await;
            });

            let handle = ConnectionHandle::new(msg_tx);
            let id = handle.id();
            if !session.connect(role, handle).await {
                let _ = writer.await;
                return;
            }

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(client_msg) => session.handle_message(role, client_msg).await,
                                    Err(e) => debug!("Ignoring malformed frame from {}: {}", role, e),
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} ({}) closed the connection", addr, role);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error for {} ({}): {}", addr, role, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            session.disconnect(role, id).await;
            writer.abort();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.session.rules, GameRules::default());
        assert_eq!(config.session.puzzle_delay, Duration::from_secs(1));
        assert_eq!(config.outbound_buffer, 64);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_server_config_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HACKLINE_BIND_ADDR", "127.0.0.1:9100"),
            ("HACKLINE_TIME_BUDGET_SECS", "30"),
            ("HACKLINE_LIVES", "5"),
            ("HACKLINE_PUZZLE_DELAY_MS", "0"),
            ("HACKLINE_CATALOG", "/tmp/ops.json"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.session.rules.time_budget_secs, 30);
        assert_eq!(config.session.rules.initial_lives, 5);
        assert!(config.session.puzzle_delay.is_zero());
        assert_eq!(config.catalog_path, Some(PathBuf::from("/tmp/ops.json")));
    }

    #[test]
    fn test_server_config_rejects_bad_values() {
        let err = ServerConfig::from_lookup(lookup(&[("HACKLINE_LIVES", "0")])).unwrap_err();
        assert_eq!(err.var, "HACKLINE_LIVES");

        let err = ServerConfig::from_lookup(lookup(&[("HACKLINE_TIME_BUDGET_SECS", "soon")])).unwrap_err();
        assert_eq!(err.var, "HACKLINE_TIME_BUDGET_SECS");
        assert_eq!(err.value, "soon");

        assert!(ServerConfig::from_lookup(lookup(&[("HACKLINE_BIND_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn test_missing_catalog_file() {
        let config = ServerConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/hackline-catalog.json")),
            ..Default::default()
        };
        assert!(matches!(GameServer::new(config), Err(GameServerError::Catalog(_))));
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = Arc::new(GameServer::new(ServerConfig::default()).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let running = server.clone();
        let task = tokio::spawn(async move { running.serve(listener).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        server.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), task).await;
        assert!(result.is_ok());
    }
}
