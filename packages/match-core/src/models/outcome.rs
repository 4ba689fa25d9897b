use serde::{Deserialize, Serialize};

use crate::models::chess_match::{DrawReason, WinReason};

/// Ratings before and after a decisive match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub winner_before: i32,
    pub winner_after: i32,
    pub loser_before: i32,
    pub loser_after: i32,
}

/// What an accepted command did to a match, for the messaging layer to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Continuing {
        match_id: String,
        position: String,
        turn_holder_id: String,
    },
    Win {
        match_id: String,
        winner_id: String,
        loser_id: String,
        reason: WinReason,
        position: String,
        ratings: Option<RatingChange>,
    },
    Draw {
        match_id: String,
        reason: DrawReason,
        position: String,
    },
}

impl MatchOutcome {
    pub fn match_id(&self) -> &str {
        match self {
            MatchOutcome::Continuing { match_id, .. }
            | MatchOutcome::Win { match_id, .. }
            | MatchOutcome::Draw { match_id, .. } => match_id,
        }
    }

    pub fn position(&self) -> &str {
        match self {
            MatchOutcome::Continuing { position, .. }
            | MatchOutcome::Win { position, .. }
            | MatchOutcome::Draw { position, .. } => position,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchOutcome::Continuing { .. })
    }
}
