use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use uuid::Uuid;

use crate::challenge::catalog::{Round, RoundKind};
use crate::challenge::scoring::{Breakdown, ScoreStatus};

/// Where a session is in the game.
#[derive(Debug, Clone, PartialEq)]
pub enum GameState {
    Idle,
    /// Round `index` (1-based) with its materialized content.
    Round {
        index: usize,
        round: Round,
        awaiting_advance: bool,
    },
    Results,
    Review,
}

impl GameState {
    pub fn label(&self) -> &'static str {
        match self {
            GameState::Idle => "idle",
            GameState::Round { .. } => "round",
            GameState::Results => "results",
            GameState::Review => "review",
        }
    }
}

/// One accepted, scored attempt. Never modified after it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub round_index: usize,
    pub round_kind: RoundKind,
    pub user_text: String,
    pub generated_text: String,
    pub scores: Breakdown,
    pub total: u32,
    pub status: ScoreStatus,
    pub created_at: DateTime<Utc>,
}

/// A single player's game. Owned by the caller and mutated only through
/// `GameStateMachine`.
#[derive(Debug)]
pub struct GameSession {
    pub(super) id: Uuid,
    pub(super) player_id: Option<String>,
    pub(super) state: GameState,
    pub(super) rounds_total: usize,
    pub(super) total_score: u32,
    pub(super) history: Vec<Submission>,
    pub(super) rng: StdRng,
}

impl GameSession {
    pub(super) fn new(rounds_total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id: None,
            state: GameState::Idle,
            rounds_total,
            total_score: 0,
            history: Vec::new(),
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Back to `Idle`, dropping everything but the session id.
    pub(super) fn clear(&mut self) {
        self.player_id = None;
        self.state = GameState::Idle;
        self.total_score = 0;
        self.history.clear();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn rounds_total(&self) -> usize {
        self.rounds_total
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn history(&self) -> &[Submission] {
        &self.history
    }
}
