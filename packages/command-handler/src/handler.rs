use std::sync::Arc;

use match_core::{
    config::{AppConfig, StoreBackend},
    models::player::Player,
    repositories::{
        in_memory::InMemoryStore, match_repository::DynamoDbMatchRepository,
        player_repository::DynamoDbPlayerRepository,
    },
    services::{
        match_session_service::MatchSessionService, player_service::PlayerService,
        rules_engine::ChessRulesEngine,
    },
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::commands::{
    accepted, match_error_response, player_error_response, rejected, Command,
};

#[derive(Clone)]
pub struct CommandHandler {
    match_sessions: MatchSessionService,
    players: PlayerService,
    leaderboard_size: usize,
}

impl CommandHandler {
    pub fn new(
        match_sessions: MatchSessionService,
        players: PlayerService,
        leaderboard_size: usize,
    ) -> Self {
        Self {
            match_sessions,
            players,
            leaderboard_size,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Self {
        let rules = Arc::new(ChessRulesEngine::new());

        match config.store_backend {
            StoreBackend::DynamoDb => {
                let aws_config = aws_config::load_from_env().await;
                let client = aws_sdk_dynamodb::Client::new(&aws_config);

                let player_repository = Arc::new(DynamoDbPlayerRepository::new(
                    client.clone(),
                    &config.players_table,
                ));
                let match_repository = Arc::new(DynamoDbMatchRepository::new(
                    client,
                    &config.matches_table,
                    &config.players_table,
                ));

                Self::new(
                    MatchSessionService::new(player_repository.clone(), match_repository, rules),
                    PlayerService::new(player_repository),
                    config.leaderboard_size,
                )
            }
            StoreBackend::InMemory => {
                warn!("Using the in-memory store; state is lost when the process exits");
                let store = Arc::new(InMemoryStore::new());

                Self::new(
                    MatchSessionService::new(store.clone(), store.clone(), rules),
                    PlayerService::new(store),
                    config.leaderboard_size,
                )
            }
        }
    }

    /// Decodes a raw invocation payload and runs it.
    pub async fn handle_payload(&self, payload: Value) -> Value {
        match serde_json::from_value::<Command>(payload) {
            Ok(command) => self.handle(command).await,
            Err(e) => {
                warn!("Rejecting malformed command: {}", e);
                rejected("invalid_command", e)
            }
        }
    }

    pub async fn handle(&self, command: Command) -> Value {
        let name = command.name();
        debug!("Handling {} command", name);

        let response = match command {
            Command::Register { player_id, handle } => {
                match self.players.register(&player_id, &handle).await {
                    Ok(player) => accepted(json!({
                        "player": player_summary(&player),
                        "verification_token": player.verification_token,
                    })),
                    Err(e) => player_error_response(&e),
                }
            }
            Command::Verify {
                player_id,
                profile_bio,
            } => match self
                .players
                .confirm_verification(&player_id, &profile_bio)
                .await
            {
                Ok(verified) => accepted(json!({ "verified": verified })),
                Err(e) => player_error_response(&e),
            },
            Command::Start {
                player_id,
                opponent_id,
            } => match self
                .match_sessions
                .start_match(&player_id, &opponent_id)
                .await
            {
                Ok(outcome) => accepted(json!({ "outcome": outcome })),
                Err(e) => match_error_response(&e),
            },
            Command::Move { player_id, token } => {
                match self.match_sessions.submit_move(&player_id, &token).await {
                    Ok(outcome) => accepted(json!({ "outcome": outcome })),
                    Err(e) => match_error_response(&e),
                }
            }
            Command::Resign { player_id } => match self.match_sessions.resign(&player_id).await {
                Ok(outcome) => accepted(json!({ "outcome": outcome })),
                Err(e) => match_error_response(&e),
            },
            Command::Status { player_id } => {
                match self.match_sessions.get_active_match(&player_id).await {
                    Ok(record) => accepted(json!({
                        "match_id": record.match_id,
                        "position": record.position,
                        "turn_holder_id": record.turn_holder_id,
                        "player1_id": record.player1_id,
                        "player2_id": record.player2_id,
                    })),
                    Err(e) => match_error_response(&e),
                }
            }
            Command::Leaderboard { limit } => {
                let limit = limit.unwrap_or(self.leaderboard_size);
                match self.players.leaderboard(limit).await {
                    Ok(players) => accepted(json!({
                        "players": players.iter().map(player_summary).collect::<Vec<_>>(),
                    })),
                    Err(e) => player_error_response(&e),
                }
            }
        };

        match response["status"].as_str() {
            Some("ok") => info!("{} command succeeded", name),
            Some("error") => error!("{} command failed: {}", name, response["message"]),
            _ => info!("{} command rejected: {}", name, response["error"]),
        }

        response
    }
}

fn player_summary(player: &Player) -> Value {
    json!({
        "player_id": player.external_id,
        "linked_handle": player.linked_handle,
        "verified": player.verified,
        "rating": player.rating,
    })
}
