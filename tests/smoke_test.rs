// End-to-end smoke test for the WebSocket server.
//
// Starts a server on localhost, connects a hacker and a spy over real
// WebSocket connections and walks through a short game: pairing, an answer,
// a duplicate role, an unknown role and a restart.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use hackline::network::protocol::RESTART_NOTICE;
use hackline::{ClientMessage, GameServer, ServerConfig, ServerMessage, SessionConfig};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (Arc<GameServer>, SocketAddr) {
    let config = ServerConfig {
        session: SessionConfig::test_mode(),
        ..Default::default()
    };
    let server = Arc::new(GameServer::new(config).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let running = server.clone();
    tokio::spawn(async move { running.serve(listener).await });

    (server, addr)
}

async fn connect(addr: SocketAddr, role: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/{role}")).await.unwrap();
    ws
}

/// Next frame, skipping clock updates. `None` once the server closed.
async fn recv(ws: &mut Client) -> Option<ServerMessage> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame");
        match frame {
            Some(Ok(Message::Text(text))) => {
                let msg = ServerMessage::from_json(&text).unwrap();
                if !matches!(msg, ServerMessage::Timer { .. }) {
                    return Some(msg);
                }
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => {}
        }
    }
}

async fn send(ws: &mut Client, msg: &ClientMessage) {
    ws.send(Message::Text(msg.to_json().unwrap())).await.unwrap();
}

#[tokio::test]
async fn full_session_lifecycle() {
    let (server, addr) = start_server().await;

    // 1. Hacker connects alone.
    let mut hacker = connect(addr, "hacker").await;
    assert_eq!(recv(&mut hacker).await, Some(ServerMessage::info("Connected as hacker")));

    // 2. Spy connects; the game starts.
    let mut spy = connect(addr, "spy").await;
    assert_eq!(recv(&mut spy).await, Some(ServerMessage::info("Connected as spy")));
    assert!(matches!(recv(&mut spy).await, Some(ServerMessage::State(_))));
    assert!(matches!(recv(&mut spy).await, Some(ServerMessage::Success { .. })));
    match recv(&mut spy).await {
        Some(ServerMessage::State(view)) => {
            assert_eq!(view.current_node, 0);
            assert_eq!(view.map.len(), 3);
            assert!(!view.game_over);
        }
        other => panic!("expected state, got {other:?}"),
    }

    assert!(matches!(recv(&mut hacker).await, Some(ServerMessage::Success { .. })));
    match recv(&mut hacker).await {
        Some(ServerMessage::Puzzle { message }) => {
            assert!(message.starts_with("[PERIMETER_FIREWALL 0/2]"));
        }
        other => panic!("expected puzzle, got {other:?}"),
    }

    // 3. A correct answer.
    send(&mut hacker, &ClientMessage::Command { message: "Red".to_string() }).await;
    assert!(matches!(recv(&mut hacker).await, Some(ServerMessage::Success { .. })));
    match recv(&mut hacker).await {
        Some(ServerMessage::Puzzle { message }) => {
            assert!(message.starts_with("[PERIMETER_FIREWALL 1/2]"));
        }
        other => panic!("expected puzzle, got {other:?}"),
    }
    assert!(matches!(recv(&mut spy).await, Some(ServerMessage::Success { .. })));
    match recv(&mut spy).await {
        Some(ServerMessage::State(view)) => {
            assert_eq!(view.node_progress, 1);
            assert_eq!(view.score, 100);
        }
        other => panic!("expected state, got {other:?}"),
    }

    // 4. Malformed frames are ignored.
    hacker.send(Message::Text("{not json".to_string())).await.unwrap();

    // 5. A second hacker is turned away; the first keeps playing.
    let mut intruder = connect(addr, "hacker").await;
    assert!(matches!(recv(&mut intruder).await, Some(ServerMessage::Error { .. })));
    assert_eq!(recv(&mut intruder).await, None);

    // 6. Unknown roles are refused during the handshake.
    match connect_async(format!("ws://{addr}/ws/admin")).await {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 404),
        other => panic!("expected HTTP refusal, got {:?}", other.map(|_| ())),
    }

    // 7. The spy restarts the game.
    send(&mut spy, &ClientMessage::Restart).await;
    assert_eq!(recv(&mut hacker).await, Some(ServerMessage::info(RESTART_NOTICE)));
    match recv(&mut hacker).await {
        Some(ServerMessage::Puzzle { message }) => {
            assert!(message.starts_with("[PERIMETER_FIREWALL 0/2]"));
        }
        other => panic!("expected puzzle, got {other:?}"),
    }
    let state = server.session().snapshot().await;
    assert_eq!(state.score, 0);
    assert_eq!(state.node_progress, 0);

    // 8. The hacker leaves; the spy is told.
    hacker.close(None).await.unwrap();
    assert_eq!(recv(&mut spy).await, Some(ServerMessage::info(RESTART_NOTICE)));
    assert!(matches!(recv(&mut spy).await, Some(ServerMessage::State(_))));
    assert_eq!(
        recv(&mut spy).await,
        Some(ServerMessage::info("The hacker has disconnected."))
    );

    server.shutdown();
}
