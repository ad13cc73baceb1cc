//! Session Coordination
//!
//! Owns the one game, the two connections playing it and the clock.
//! Every mutation (connect, disconnect, answer, tick, restart) runs under a
//! single lock and pushes its notices and views before releasing it, so
//! answer processing and clock ticks never interleave mid-transition.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::game::catalog::Catalog;
use crate::game::events::GameEvent;
use crate::game::state::{GameRules, GameState, Outcome};
use crate::game::transition::{self, TickResult, Verdict};
use crate::game::view::{observer_view, solver_view};
use crate::network::protocol::{ClientMessage, Role, ServerMessage, RESTART_NOTICE};
use crate::network::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
use crate::{NODE_CLEAR_BONUS, PUZZLE_PUSH_DELAY_MS};

/// Configuration for the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Starting time and lives.
    pub rules: GameRules,
    /// Clock period. One tick removes one second from the game clock.
    pub tick_interval: Duration,
    /// Pause before the next puzzle after a correct answer. Zero pushes it
    /// immediately (test mode).
    pub puzzle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rules: GameRules::default(),
            tick_interval: Duration::from_secs(1),
            puzzle_delay: Duration::from_millis(PUZZLE_PUSH_DELAY_MS),
        }
    }
}

impl SessionConfig {
    /// Default configuration without puzzle pacing.
    pub fn test_mode() -> Self {
        Self {
            puzzle_delay: Duration::ZERO,
            ..Default::default()
        }
    }
}

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Another connection already holds the role.
    #[error("role {0} is already taken")]
    RoleOccupied(Role),
}

/// Handle to the running clock task.
#[derive(Debug)]
pub struct TimerHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Stop the clock. Safe to call more than once, or after the task
    /// already finished.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Which start of the clock this handle belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct SessionInner {
    state: GameState,
    registry: ConnectionRegistry,
    timer: Option<TimerHandle>,
    /// Bumped on every timer start; a loop whose generation is stale exits.
    timer_generation: u64,
    /// Bumped on every reset; delayed puzzle pushes from an older game are dropped.
    game_epoch: u64,
}

/// The session coordinator.
pub struct SessionCoordinator {
    catalog: Arc<Catalog>,
    config: SessionConfig,
    inner: Mutex<SessionInner>,
}

impl SessionCoordinator {
    /// Create a coordinator with a fresh, idle game.
    pub fn new(catalog: Arc<Catalog>, config: SessionConfig) -> Arc<Self> {
        let state = GameState::new(&config.rules);
        Arc::new(Self {
            catalog,
            config,
            inner: Mutex::new(SessionInner {
                state,
                registry: ConnectionRegistry::new(),
                timer: None,
                timer_generation: 0,
                game_epoch: 0,
            }),
        })
    }

    /// The catalog being played.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // =========================================================================
    // CONNECTION LIFECYCLE
    // =========================================================================

    /// Register a new connection for `role`.
    ///
    /// Returns false if the role was already taken; the new connection has
    /// then been sent an error and closed.
    pub async fn connect(self: &Arc<Self>, role: Role, handle: ConnectionHandle) -> bool {
        let mut inner = self.inner.lock().await;
        let id = handle.id();

        if let Err(e) = inner.registry.attempt_attach(role, handle) {
            info!("Rejected connection {}: {}", id, e);
            return false;
        }
        info!("Player connected: {} ({})", role, id);

        inner.registry.send_to(role, ServerMessage::info(format!("Connected as {role}")));

        if role == Role::Spy {
            self.push_observer_view(&inner);
        }

        if inner.registry.both_attached() {
            if inner.timer.is_none() {
                self.reset_game(&mut inner);
                info!("Both players online, game started");
            }
            inner.registry.broadcast(&ServerMessage::success(
                "Secure link established. Hacker and spy are online.",
            ));
            self.push_puzzle(&inner);
            self.push_observer_view(&inner);
        }

        true
    }

    /// Remove the connection holding `role`, if it is still `id`.
    ///
    /// The clock keeps running; the remaining player plays on against it.
    pub async fn disconnect(&self, role: Role, id: ConnectionId) {
        let mut inner = self.inner.lock().await;

        if inner.registry.get(role).map(ConnectionHandle::id) != Some(id) {
            debug!("Ignoring disconnect of stale connection {} for {}", id, role);
            return;
        }

        inner.registry.detach(role);
        info!("Player disconnected: {} ({})", role, id);

        inner.registry.broadcast(&ServerMessage::info(format!("The {role} has disconnected.")));
        self.push_observer_view(&inner);
    }

    /// Dispatch an inbound message from `role`.
    pub async fn handle_message(self: &Arc<Self>, role: Role, message: ClientMessage) {
        match message {
            ClientMessage::Restart => self.restart().await,
            ClientMessage::Command { message } if role == Role::Hacker => {
                self.submit_answer(&message).await;
            }
            ClientMessage::Command { .. } => {
                debug!("Ignoring command from {}", role);
            }
        }
    }

    // =========================================================================
    // GAME TRANSITIONS
    // =========================================================================

    /// Judge an answer from the hacker and push the consequences.
    ///
    /// Ignored unless both players are connected and the game is running.
    pub async fn submit_answer(self: &Arc<Self>, text: &str) -> Verdict {
        let mut inner = self.inner.lock().await;

        if !inner.registry.both_attached() {
            debug!("Ignoring answer while a player is missing");
            return Verdict::Ignored;
        }

        let result = transition::submit_answer(&mut inner.state, &self.catalog, text);
        if result.verdict == Verdict::Ignored {
            return result.verdict;
        }

        debug!(verdict = ?result.verdict, "Answer {:?} judged", text);
        for event in &result.events {
            inner.registry.broadcast(&self.event_notice(event));
        }
        self.push_observer_view(&inner);

        match (result.verdict, result.game_over) {
            (_, Some(outcome)) => {
                info!("Game over: {}", outcome);
                Self::stop_timer(&mut inner);
            }
            (Verdict::Correct, None) => self.schedule_next_puzzle(&inner),
            _ => self.push_puzzle(&inner),
        }

        result.verdict
    }

    /// Apply one clock tick. Normally driven by the timer loop.
    pub async fn time_tick(&self) -> TickResult {
        let mut inner = self.inner.lock().await;
        let result = self.apply_tick(&mut inner);
        if result.expired {
            Self::stop_timer(&mut inner);
        }
        result
    }

    /// Start a new game: stop the clock, reset, start the clock, push views.
    pub async fn restart(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;

        self.reset_game(&mut inner);
        info!("Game restarted");

        inner.registry.broadcast(&ServerMessage::info(RESTART_NOTICE));
        self.push_observer_view(&inner);
        self.push_puzzle(&inner);
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// Copy of the current game state.
    pub async fn snapshot(&self) -> GameState {
        self.inner.lock().await.state.clone()
    }

    /// Whether a clock task is currently running.
    pub async fn timer_active(&self) -> bool {
        self.inner.lock().await.timer.is_some()
    }

    /// Whether a role is currently held.
    pub async fn is_connected(&self, role: Role) -> bool {
        self.inner.lock().await.registry.is_attached(role)
    }

    // =========================================================================
    // INTERNALS (all called with the lock held)
    // =========================================================================

    fn reset_game(self: &Arc<Self>, inner: &mut SessionInner) {
        Self::stop_timer(inner);
        inner.state.reset(&self.config.rules);
        inner.game_epoch += 1;
        self.start_timer(inner);
    }

    fn start_timer(self: &Arc<Self>, inner: &mut SessionInner) {
        Self::stop_timer(inner);
        inner.timer_generation += 1;
        let generation = inner.timer_generation;

        let task = tokio::spawn(run_timer_loop(
            Arc::downgrade(self),
            generation,
            self.config.tick_interval,
        ));
        inner.timer = Some(TimerHandle { generation, task });
        debug!("Timer {} started", generation);
    }

    fn stop_timer(inner: &mut SessionInner) {
        if let Some(timer) = inner.timer.take() {
            timer.cancel();
            debug!("Timer {} stopped", timer.generation());
        }
    }

    fn apply_tick(&self, inner: &mut SessionInner) -> TickResult {
        let result = transition::time_tick(&mut inner.state);
        if !result.applied {
            return result;
        }

        inner.registry.broadcast(&ServerMessage::Timer { time: result.time_remaining });

        if result.expired {
            info!("Game over: {}", Outcome::DefeatTimeout);
            inner.registry.broadcast(&ServerMessage::error(
                "Time is up. The connection was traced.",
            ));
            self.push_observer_view(inner);
        }

        result
    }

    fn push_observer_view(&self, inner: &SessionInner) {
        if !inner.registry.is_attached(Role::Spy) {
            return;
        }
        let hacker_connected = inner.registry.is_attached(Role::Hacker);
        let view = observer_view(&inner.state, &self.catalog, hacker_connected);
        inner.registry.send_to(Role::Spy, ServerMessage::State(view));
    }

    fn push_puzzle(&self, inner: &SessionInner) {
        if let Some(view) = solver_view(&inner.state, &self.catalog) {
            inner.registry.send_to(Role::Hacker, ServerMessage::puzzle(view.message()));
        }
    }

    fn schedule_next_puzzle(self: &Arc<Self>, inner: &SessionInner) {
        let delay = self.config.puzzle_delay;
        if delay.is_zero() {
            self.push_puzzle(inner);
            return;
        }

        let session = Arc::downgrade(self);
        let epoch = inner.game_epoch;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(session) = session.upgrade() else {
                return;
            };
            let inner = session.inner.lock().await;
            if inner.game_epoch == epoch && !inner.state.is_over() {
                session.push_puzzle(&inner);
            }
        });
    }

    fn node_name(&self, index: usize) -> &str {
        self.catalog.node(index).map(|n| n.name.as_str()).unwrap_or("?")
    }

    fn event_notice(&self, event: &GameEvent) -> ServerMessage {
        match event {
            GameEvent::PuzzleSolved { progress, required, .. } => {
                ServerMessage::success(format!("Access granted. Layer {progress}/{required} decrypted."))
            }
            GameEvent::NodeBreached { node } => ServerMessage::success(format!(
                "Node {} breached! +{} bonus.",
                self.node_name(*node),
                NODE_CLEAR_BONUS
            )),
            GameEvent::AnswerRejected { lives_left } => {
                ServerMessage::error(format!("Access denied. Lives left: {lives_left}."))
            }
            GameEvent::ProgressLost { node, .. } => ServerMessage::error(format!(
                "Intrusion detected. Progress in {} was lost.",
                self.node_name(*node)
            )),
            GameEvent::GameOver { outcome: Outcome::Victory } => {
                ServerMessage::success("Mainframe breached. Mission complete!")
            }
            GameEvent::GameOver { outcome: Outcome::DefeatLives } => {
                ServerMessage::error("No lives left. The hacker was traced.")
            }
            GameEvent::GameOver { outcome: Outcome::DefeatTimeout } => {
                ServerMessage::error("Time is up. The connection was traced.")
            }
        }
    }
}

/// Clock task: one tick per period until the game ends, the session is
/// dropped or a newer timer supersedes this one.
async fn run_timer_loop(session: Weak<SessionCoordinator>, generation: u64, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(session) = session.upgrade() else {
            break;
        };
        let mut inner = session.inner.lock().await;

        if inner.timer_generation != generation {
            break;
        }

        let result = session.apply_tick(&mut inner);
        if !result.applied || result.expired {
            // Drop our own handle without aborting; the loop ends here.
            inner.timer = None;
            debug!("Timer {} finished", generation);
            break;
        }
    }
}
