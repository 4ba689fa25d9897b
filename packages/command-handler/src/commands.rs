use match_core::services::errors::{
    match_session_service_errors::MatchSessionServiceError,
    player_service_errors::PlayerServiceError,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// A chat command, already resolved to player ids by the messaging layer.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Register {
        player_id: String,
        handle: String,
    },
    Verify {
        player_id: String,
        profile_bio: String,
    },
    Start {
        player_id: String,
        opponent_id: String,
    },
    Move {
        player_id: String,
        token: String,
    },
    Resign {
        player_id: String,
    },
    Status {
        player_id: String,
    },
    Leaderboard {
        limit: Option<usize>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Register { .. } => "register",
            Command::Verify { .. } => "verify",
            Command::Start { .. } => "start",
            Command::Move { .. } => "move",
            Command::Resign { .. } => "resign",
            Command::Status { .. } => "status",
            Command::Leaderboard { .. } => "leaderboard",
        }
    }
}

pub fn accepted(body: Value) -> Value {
    let mut response = json!({ "status": "ok" });
    if let (Some(response), Value::Object(fields)) = (response.as_object_mut(), body) {
        response.extend(fields);
    }
    response
}

pub fn rejected(code: &str, message: impl std::fmt::Display) -> Value {
    json!({
        "status": "rejected",
        "error": code,
        "message": message.to_string(),
    })
}

/// Collaborator failures the caller may retry.
pub fn failed(code: &str, message: impl std::fmt::Display) -> Value {
    json!({
        "status": "error",
        "error": code,
        "message": message.to_string(),
    })
}

pub fn match_error_response(error: &MatchSessionServiceError) -> Value {
    match error {
        MatchSessionServiceError::PlayerNotRegistered(_) => {
            rejected("player_not_registered", error)
        }
        MatchSessionServiceError::PlayerBusy(_) => rejected("player_busy", error),
        MatchSessionServiceError::NoActiveMatch => rejected("no_active_match", error),
        MatchSessionServiceError::NotYourTurn => rejected("not_your_turn", error),
        MatchSessionServiceError::IllegalMove(_) => rejected("illegal_move", error),
        MatchSessionServiceError::ValidationError(_) => rejected("validation_error", error),
        MatchSessionServiceError::MatchConflict(_) => failed("match_conflict", error),
        MatchSessionServiceError::CorruptMatch(_) => failed("corrupt_match", error),
        MatchSessionServiceError::Rating(_) => failed("rating_error", error),
        MatchSessionServiceError::StoreUnavailable(_) => failed("store_unavailable", error),
    }
}

pub fn player_error_response(error: &PlayerServiceError) -> Value {
    match error {
        PlayerServiceError::PlayerNotFound => rejected("player_not_registered", error),
        PlayerServiceError::NoPendingVerification => rejected("no_pending_verification", error),
        PlayerServiceError::ValidationError(_) => rejected("validation_error", error),
        PlayerServiceError::RepositoryError(_) => failed("store_unavailable", error),
    }
}
