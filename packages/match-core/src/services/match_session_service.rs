use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    models::{
        chess_match::{DrawReason, Match, MatchResult, WinReason},
        outcome::MatchOutcome,
        player::Player,
    },
    repositories::{match_repository::MatchRepository, player_repository::PlayerRepository},
    services::{
        errors::match_session_service_errors::MatchSessionServiceError,
        rating_service,
        rules_engine::{RulesEngine, TerminalStatus},
    },
};

/// Drives match lifecycles: start, move, resign.
///
/// Holds no match state between calls. Every operation re-reads the player
/// records and the active match, re-checks the invariants, and then makes a
/// single conditional write keyed on the match version it read.
#[derive(Clone)]
pub struct MatchSessionService {
    players: Arc<dyn PlayerRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    rules: Arc<dyn RulesEngine + Send + Sync>,
}

impl MatchSessionService {
    pub fn new(
        players: Arc<dyn PlayerRepository + Send + Sync>,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        rules: Arc<dyn RulesEngine + Send + Sync>,
    ) -> Self {
        MatchSessionService {
            players,
            matches,
            rules,
        }
    }

    pub async fn start_match(
        &self,
        initiator_id: &str,
        opponent_id: &str,
    ) -> Result<MatchOutcome, MatchSessionServiceError> {
        if initiator_id.is_empty() || opponent_id.is_empty() {
            return Err(MatchSessionServiceError::ValidationError(
                "Player ids cannot be empty".to_string(),
            ));
        }
        if initiator_id == opponent_id {
            return Err(MatchSessionServiceError::ValidationError(
                "A player cannot start a match against themselves".to_string(),
            ));
        }

        self.require_player(initiator_id).await?;
        self.require_player(opponent_id).await?;

        for player_id in [initiator_id, opponent_id] {
            if let Some(ongoing) = self.matches.find_active_match_for(player_id).await? {
                debug!(
                    "Player {} is busy in match {}",
                    player_id, ongoing.match_id
                );
                return Err(MatchSessionServiceError::PlayerBusy(player_id.to_string()));
            }
        }

        let record = Match::new(initiator_id, opponent_id, self.rules.initial_position());
        self.matches.create_match(&record).await?;

        info!(
            "Match {} started between {} and {}",
            record.match_id, initiator_id, opponent_id
        );

        Ok(MatchOutcome::Continuing {
            match_id: record.match_id,
            position: record.position,
            turn_holder_id: record.turn_holder_id,
        })
    }

    pub async fn submit_move(
        &self,
        player_id: &str,
        move_token: &str,
    ) -> Result<MatchOutcome, MatchSessionServiceError> {
        self.require_player(player_id).await?;
        let mut record = self.require_active_match(player_id).await?;

        if record.turn_holder_id != player_id {
            return Err(MatchSessionServiceError::NotYourTurn);
        }

        let next = self
            .rules
            .apply_move(&record.current_position(), move_token)?;
        let status = self.rules.terminal_status(&next)?;

        let expected_version = record.version;
        record.version += 1;
        record.advance(next);

        debug!(
            "Match {}: {} played {} ({:?})",
            record.match_id, player_id, move_token, status
        );

        match status {
            TerminalStatus::Ongoing => {
                self.matches
                    .update_match(&record, expected_version)
                    .await?;
                Ok(MatchOutcome::Continuing {
                    match_id: record.match_id,
                    position: record.position,
                    turn_holder_id: record.turn_holder_id,
                })
            }
            TerminalStatus::Checkmate => {
                // The side left to move is the side that was mated.
                let loser_id = record.turn_holder_id.clone();
                self.complete_decisive(record, expected_version, player_id, &loser_id)
                    .await
            }
            TerminalStatus::Stalemate => {
                self.complete_draw(record, expected_version, DrawReason::Stalemate)
                    .await
            }
            TerminalStatus::FiftyMoveRule => {
                self.complete_draw(record, expected_version, DrawReason::FiftyMoveRule)
                    .await
            }
            TerminalStatus::InsufficientMaterial => {
                self.complete_draw(record, expected_version, DrawReason::InsufficientMaterial)
                    .await
            }
            TerminalStatus::Repetition => {
                self.complete_draw(record, expected_version, DrawReason::Repetition)
                    .await
            }
        }
    }

    /// Concedes the caller's active match. Ratings are left as they are.
    pub async fn resign(&self, player_id: &str) -> Result<MatchOutcome, MatchSessionServiceError> {
        self.require_player(player_id).await?;
        let mut record = self.require_active_match(player_id).await?;

        let winner_id = record
            .opponent_of(player_id)
            .ok_or(MatchSessionServiceError::NoActiveMatch)?
            .to_string();

        let expected_version = record.version;
        record.version += 1;
        record.resolve(MatchResult::Win {
            winner_id: winner_id.clone(),
            reason: WinReason::Resignation,
        });
        self.matches
            .update_match(&record, expected_version)
            .await?;

        info!(
            "Match {}: {} resigned, {} wins",
            record.match_id, player_id, winner_id
        );

        Ok(MatchOutcome::Win {
            match_id: record.match_id,
            winner_id,
            loser_id: player_id.to_string(),
            reason: WinReason::Resignation,
            position: record.position,
            ratings: None,
        })
    }

    pub async fn get_active_match(
        &self,
        player_id: &str,
    ) -> Result<Match, MatchSessionServiceError> {
        self.require_player(player_id).await?;
        self.require_active_match(player_id).await
    }

    async fn require_player(&self, player_id: &str) -> Result<Player, MatchSessionServiceError> {
        self.players
            .get_player(player_id)
            .await?
            .ok_or_else(|| MatchSessionServiceError::PlayerNotRegistered(player_id.to_string()))
    }

    async fn require_active_match(
        &self,
        player_id: &str,
    ) -> Result<Match, MatchSessionServiceError> {
        match self.matches.find_active_match_for(player_id).await? {
            Some(record) if record.is_active() => Ok(record),
            Some(record) => {
                warn!(
                    "Store returned resolved match {} as active for {}",
                    record.match_id, player_id
                );
                Err(MatchSessionServiceError::NoActiveMatch)
            }
            None => Err(MatchSessionServiceError::NoActiveMatch),
        }
    }

    async fn complete_decisive(
        &self,
        mut record: Match,
        expected_version: u64,
        winner_id: &str,
        loser_id: &str,
    ) -> Result<MatchOutcome, MatchSessionServiceError> {
        let winner = self.require_player(winner_id).await?;
        let loser = self.require_player(loser_id).await?;

        let change = rating_service::rate(winner.rating, loser.rating)?;

        record.resolve(MatchResult::Win {
            winner_id: winner_id.to_string(),
            reason: WinReason::Checkmate,
        });
        self.matches
            .complete_decisive_match(&record, expected_version, winner_id, loser_id, &change)
            .await?;

        info!(
            "Match {}: {} checkmated {} ({} -> {}, {} -> {})",
            record.match_id,
            winner_id,
            loser_id,
            change.winner_before,
            change.winner_after,
            change.loser_before,
            change.loser_after
        );

        Ok(MatchOutcome::Win {
            match_id: record.match_id,
            winner_id: winner_id.to_string(),
            loser_id: loser_id.to_string(),
            reason: WinReason::Checkmate,
            position: record.position,
            ratings: Some(change),
        })
    }

    async fn complete_draw(
        &self,
        mut record: Match,
        expected_version: u64,
        reason: DrawReason,
    ) -> Result<MatchOutcome, MatchSessionServiceError> {
        record.resolve(MatchResult::Draw { reason });
        self.matches
            .update_match(&record, expected_version)
            .await?;

        info!("Match {} drawn by {:?}", record.match_id, reason);

        Ok(MatchOutcome::Draw {
            match_id: record.match_id,
            reason,
            position: record.position,
        })
    }
}
