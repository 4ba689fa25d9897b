use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    Checkmate,
    Resignation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    Stalemate,
    FiftyMoveRule,
    InsufficientMaterial,
    Repetition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Win {
        winner_id: String,
        reason: WinReason,
    },
    Draw {
        reason: DrawReason,
    },
}

/// A match between two players. `player1_id` started it and plays white.
///
/// `active` and `result` move together: an active match has no result and a
/// resolved match always has one. Use [`Match::resolve`] rather than
/// writing either field directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: String,
    pub player1_id: String,
    pub player2_id: String,
    pub position: String,
    pub repetition_keys: Vec<String>,
    pub active: bool,
    pub result: Option<MatchResult>,
    pub turn_holder_id: String,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn new(player1_id: &str, player2_id: &str, initial: Position) -> Self {
        let now = Utc::now();
        Match {
            match_id: Uuid::new_v4().to_string(),
            player1_id: player1_id.to_string(),
            player2_id: player2_id.to_string(),
            position: initial.fen,
            repetition_keys: initial.repetition_keys,
            active: true,
            result: None,
            turn_holder_id: player1_id.to_string(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active && self.result.is_none()
    }

    pub fn involves(&self, player_id: &str) -> bool {
        self.player1_id == player_id || self.player2_id == player_id
    }

    /// The other side of the match, or `None` if `player_id` isn't playing.
    pub fn opponent_of(&self, player_id: &str) -> Option<&str> {
        if self.player1_id == player_id {
            Some(&self.player2_id)
        } else if self.player2_id == player_id {
            Some(&self.player1_id)
        } else {
            None
        }
    }

    pub fn current_position(&self) -> Position {
        Position::new(self.position.clone(), self.repetition_keys.clone())
    }

    /// Installs the position reached by an accepted move and hands the turn over.
    pub fn advance(&mut self, next: Position) {
        self.position = next.fen;
        self.repetition_keys = next.repetition_keys;
        if let Some(next_holder) = self.opponent_of(&self.turn_holder_id) {
            self.turn_holder_id = next_holder.to_string();
        }
        self.updated_at = Utc::now();
    }

    pub fn resolve(&mut self, result: MatchResult) {
        self.active = false;
        self.result = Some(result);
        self.updated_at = Utc::now();
    }
}
