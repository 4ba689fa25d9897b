use crate::repositories::errors::{
    match_repository_errors::MatchRepositoryError, player_repository_errors::PlayerRepositoryError,
};
use crate::services::errors::{rating_errors::RatingError, rules_engine_errors::RulesEngineError};

#[derive(Debug)]
pub enum MatchSessionServiceError {
    PlayerNotRegistered(String),
    PlayerBusy(String),
    NoActiveMatch,
    NotYourTurn,
    IllegalMove(String),
    ValidationError(String),
    /// Another command changed the match between our read and our write.
    MatchConflict(String),
    /// The stored position could not be read by the rules engine.
    CorruptMatch(String),
    Rating(RatingError),
    StoreUnavailable(String),
}

impl std::fmt::Display for MatchSessionServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchSessionServiceError::PlayerNotRegistered(id) => {
                write!(f, "Player {} is not registered", id)
            }
            MatchSessionServiceError::PlayerBusy(id) => {
                write!(f, "Player {} is already in an ongoing match", id)
            }
            MatchSessionServiceError::NoActiveMatch => write!(f, "No ongoing match found"),
            MatchSessionServiceError::NotYourTurn => write!(f, "It is not your turn to move"),
            MatchSessionServiceError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
            MatchSessionServiceError::ValidationError(msg) => {
                write!(f, "Validation error: {}", msg)
            }
            MatchSessionServiceError::MatchConflict(match_id) => {
                write!(f, "Match {} changed concurrently, please retry", match_id)
            }
            MatchSessionServiceError::CorruptMatch(msg) => write!(f, "Corrupt match: {}", msg),
            MatchSessionServiceError::Rating(err) => write!(f, "Rating error: {}", err),
            MatchSessionServiceError::StoreUnavailable(msg) => {
                write!(f, "Store unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for MatchSessionServiceError {}

impl From<PlayerRepositoryError> for MatchSessionServiceError {
    fn from(err: PlayerRepositoryError) -> Self {
        MatchSessionServiceError::StoreUnavailable(err.to_string())
    }
}

impl From<MatchRepositoryError> for MatchSessionServiceError {
    fn from(err: MatchRepositoryError) -> Self {
        match err {
            MatchRepositoryError::Conflict(match_id) => {
                MatchSessionServiceError::MatchConflict(match_id)
            }
            other => MatchSessionServiceError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<RulesEngineError> for MatchSessionServiceError {
    fn from(err: RulesEngineError) -> Self {
        match err {
            RulesEngineError::IllegalMove(msg) => MatchSessionServiceError::IllegalMove(msg),
            RulesEngineError::InvalidPosition(msg) => MatchSessionServiceError::CorruptMatch(msg),
        }
    }
}

impl From<RatingError> for MatchSessionServiceError {
    fn from(err: RatingError) -> Self {
        MatchSessionServiceError::Rating(err)
    }
}
