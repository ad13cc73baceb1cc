//! State Transitions
//!
//! The two stimuli that move a game forward: an answer from the hacker and
//! a one-second clock tick. Both are plain functions over `GameState` so the
//! caller decides how they are serialized against each other.

use crate::game::answer::is_correct;
use crate::game::catalog::Catalog;
use crate::game::events::GameEvent;
use crate::game::state::{GameState, Outcome};
use crate::{
    MISS_PENALTY_POINTS, MISS_TIME_PENALTY_SECS, NODE_CLEAR_BONUS, SOLVE_POINTS,
    SOLVE_TIME_BONUS_SECS,
};

/// How a submission was judged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Not applied: game over or no current puzzle.
    #[default]
    Ignored,
    /// Correct answer.
    Correct,
    /// Wrong answer.
    Incorrect,
}

/// Result of an answer submission.
#[derive(Debug, Default)]
pub struct AnswerResult {
    /// Verdict.
    pub verdict: Verdict,
    /// Events generated, in order.
    pub events: Vec<GameEvent>,
    /// Set if this submission ended the game.
    pub game_over: Option<Outcome>,
}

/// Result of a clock tick.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickResult {
    /// False if the game was already over and nothing changed.
    pub applied: bool,
    /// Clock after the tick.
    pub time_remaining: u32,
    /// Whether this tick ran the clock out.
    pub expired: bool,
}

/// Apply an answer submitted by the hacker.
pub fn submit_answer(state: &mut GameState, catalog: &Catalog, text: &str) -> AnswerResult {
    let mut result = AnswerResult::default();

    if state.is_over() {
        return result;
    }

    let Some(puzzle) = catalog.puzzle(state.current_node, state.node_progress) else {
        return result;
    };

    if is_correct(text, &puzzle.answer) {
        apply_correct(state, catalog, &mut result);
    } else {
        apply_incorrect(state, &mut result);
    }

    result
}

fn apply_correct(state: &mut GameState, catalog: &Catalog, result: &mut AnswerResult) {
    result.verdict = Verdict::Correct;

    let required = catalog
        .node(state.current_node)
        .map(|n| n.required_successes)
        .unwrap_or(1);

    state.node_progress += 1;
    state.score = state.score.saturating_add(SOLVE_POINTS);
    state.time_remaining = state.time_remaining.saturating_add(SOLVE_TIME_BONUS_SECS);

    result.events.push(GameEvent::PuzzleSolved {
        node: state.current_node,
        progress: state.node_progress,
        required,
    });

    if state.node_progress >= required {
        result.events.push(GameEvent::NodeBreached { node: state.current_node });
        state.current_node += 1;
        state.node_progress = 0;
        state.score = state.score.saturating_add(NODE_CLEAR_BONUS);

        if state.current_node >= catalog.len() {
            end_game(state, Outcome::Victory, result);
        }
    }
}

fn apply_incorrect(state: &mut GameState, result: &mut AnswerResult) {
    result.verdict = Verdict::Incorrect;

    state.lives = state.lives.saturating_sub(1);
    state.time_remaining = state.time_remaining.saturating_sub(MISS_TIME_PENALTY_SECS);
    state.score = state.score.saturating_sub(MISS_PENALTY_POINTS);

    result.events.push(GameEvent::AnswerRejected { lives_left: state.lives });

    if state.lives == 0 {
        end_game(state, Outcome::DefeatLives, result);
    } else if state.node_progress > 0 {
        result.events.push(GameEvent::ProgressLost {
            node: state.current_node,
            lost: state.node_progress,
        });
        state.node_progress = 0;
    }
}

fn end_game(state: &mut GameState, outcome: Outcome, result: &mut AnswerResult) {
    state.outcome = Some(outcome);
    result.game_over = Some(outcome);
    result.events.push(GameEvent::GameOver { outcome });
}

/// Advance the clock by one second.
pub fn time_tick(state: &mut GameState) -> TickResult {
    if state.is_over() {
        return TickResult {
            applied: false,
            time_remaining: state.time_remaining,
            expired: false,
        };
    }

    state.time_remaining = state.time_remaining.saturating_sub(1);
    let expired = state.time_remaining == 0;
    if expired {
        state.outcome = Some(Outcome::DefeatTimeout);
    }

    TickResult {
        applied: true,
        time_remaining: state.time_remaining,
        expired,
    }
}
