use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use crate::models::player::Player;
use crate::repositories::errors::player_repository_errors::PlayerRepositoryError;
use crate::repositories::player_repository::PlayerRepository;
use crate::services::errors::player_service_errors::PlayerServiceError;

pub const VERIFICATION_TOKEN_LENGTH: usize = 16;
pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;

/// Registration, handle verification and rating lookups.
#[derive(Clone)]
pub struct PlayerService {
    repository: Arc<dyn PlayerRepository + Send + Sync>,
}

impl PlayerService {
    pub fn new(repository: Arc<dyn PlayerRepository + Send + Sync>) -> Self {
        PlayerService { repository }
    }

    /// Creates the player on first use, or re-links an existing one. Either
    /// way the handle is unverified until [`PlayerService::confirm_verification`]
    /// sees the returned token. Re-linking only writes the handle and
    /// verification fields, so the rating is never overwritten.
    pub async fn register(
        &self,
        external_id: &str,
        handle: &str,
    ) -> Result<Player, PlayerServiceError> {
        let handle = handle.trim();
        if external_id.is_empty() || handle.is_empty() {
            return Err(PlayerServiceError::ValidationError(
                "Player id and handle cannot be empty".to_string(),
            ));
        }

        let player = match self.repository.get_player(external_id).await? {
            Some(mut existing) => {
                existing.link_handle(handle, generate_verification_token());
                self.repository.update_verification(&existing).await?
            }
            None => {
                let mut player = Player::new(external_id);
                player.link_handle(handle, generate_verification_token());
                match self.repository.create_player(&player).await {
                    Ok(()) => player,
                    // Registered concurrently; link onto that record instead.
                    Err(PlayerRepositoryError::AlreadyExists(_)) => {
                        self.repository.update_verification(&player).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        info!("Player {} linked handle {}", external_id, handle);
        Ok(player)
    }

    /// Checks `profile_bio` (fetched by the caller from the linked service)
    /// for the pending token. Returns whether the player is now verified.
    pub async fn confirm_verification(
        &self,
        external_id: &str,
        profile_bio: &str,
    ) -> Result<bool, PlayerServiceError> {
        let mut player = self.get_player(external_id).await?;

        let token = match (&player.linked_handle, &player.verification_token) {
            (Some(_), Some(token)) => token.clone(),
            _ => return Err(PlayerServiceError::NoPendingVerification),
        };

        if !profile_bio.contains(&token) {
            return Ok(false);
        }

        player.mark_verified();
        self.repository
            .update_verification(&player)
            .await
            .map_err(|e| match e {
                PlayerRepositoryError::NotFound(_) => PlayerServiceError::PlayerNotFound,
                other => other.into(),
            })?;

        info!("Player {} verified", external_id);
        Ok(true)
    }

    pub async fn get_player(&self, external_id: &str) -> Result<Player, PlayerServiceError> {
        if external_id.is_empty() {
            return Err(PlayerServiceError::ValidationError(
                "Player id cannot be empty".to_string(),
            ));
        }
        self.repository
            .get_player(external_id)
            .await?
            .ok_or(PlayerServiceError::PlayerNotFound)
    }

    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<Player>, PlayerServiceError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self.repository.top_players(limit).await?)
    }
}

/// Alphanumeric token drawn from the thread-local CSPRNG.
pub fn generate_verification_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::in_memory::InMemoryStore;
    use crate::repositories::player_repository::MockPlayerRepository;
    use crate::services::match_session_service::MatchSessionService;
    use crate::services::rules_engine::ChessRulesEngine;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Holds every lookup until `release` is notified, leaving a window
    /// between a read and the write that follows it.
    struct PausedAfterRead {
        store: Arc<InMemoryStore>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl PlayerRepository for PausedAfterRead {
        async fn get_player(
            &self,
            external_id: &str,
        ) -> Result<Option<Player>, PlayerRepositoryError> {
            let player = self.store.get_player(external_id).await?;
            self.release.notified().await;
            Ok(player)
        }

        async fn create_player(&self, player: &Player) -> Result<(), PlayerRepositoryError> {
            self.store.create_player(player).await
        }

        async fn update_verification(
            &self,
            player: &Player,
        ) -> Result<Player, PlayerRepositoryError> {
            self.store.update_verification(player).await
        }

        async fn top_players(&self, limit: usize) -> Result<Vec<Player>, PlayerRepositoryError> {
            self.store.top_players(limit).await
        }
    }

    fn service() -> (Arc<InMemoryStore>, PlayerService) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), PlayerService::new(store))
    }

    #[test]
    fn test_verification_tokens() {
        let a = generate_verification_token();
        let b = generate_verification_token();

        assert_eq!(a.len(), VERIFICATION_TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_register_creates_player() {
        let (store, service) = service();

        let player = service.register("discord-1", " magnus ").await.unwrap();

        assert_eq!(player.linked_handle.as_deref(), Some("magnus"));
        assert_eq!(player.rating, 1200);
        assert!(!player.verified);
        assert!(player.verification_token.is_some());
        assert_eq!(store.get_player("discord-1").await.unwrap(), Some(player));
    }

    #[tokio::test]
    async fn test_reregistration_keeps_rating_and_resets_verification() {
        let (store, service) = service();
        let mut rated = Player::new("discord-1");
        rated.rating = 1450;
        store.create_player(&rated).await.unwrap();
        let first = service.register("discord-1", "magnus").await.unwrap();
        let token = first.verification_token.clone().unwrap();
        service
            .confirm_verification("discord-1", &format!("bio {}", token))
            .await
            .unwrap();

        let second = service.register("discord-1", "hikaru").await.unwrap();

        assert_eq!(second.rating, 1450);
        assert!(!second.verified);
        assert_ne!(second.verification_token, first.verification_token);
        assert_eq!(second.created_at, rated.created_at);
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let (_store, service) = service();

        assert!(matches!(
            service.register("", "magnus").await,
            Err(PlayerServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.register("discord-1", "   ").await,
            Err(PlayerServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_verification() {
        let (store, service) = service();
        let player = service.register("discord-1", "magnus").await.unwrap();
        let token = player.verification_token.unwrap();

        let missing = service
            .confirm_verification("discord-1", "just a chess fan")
            .await
            .unwrap();
        assert!(!missing);
        assert!(!store.get_player("discord-1").await.unwrap().unwrap().verified);

        let found = service
            .confirm_verification("discord-1", &format!("my code: {}", token))
            .await
            .unwrap();
        assert!(found);

        let stored = store.get_player("discord-1").await.unwrap().unwrap();
        assert!(stored.verified);
        assert!(stored.verification_token.is_none());

        assert!(matches!(
            service.confirm_verification("discord-1", &token).await,
            Err(PlayerServiceError::NoPendingVerification)
        ));
    }

    #[tokio::test]
    async fn test_confirm_verification_unknown_player() {
        let (_store, service) = service();

        assert!(matches!(
            service.confirm_verification("ghost", "bio").await,
            Err(PlayerServiceError::PlayerNotFound)
        ));
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let (store, service) = service();
        for (id, rating) in [("a", 1210), ("b", 1390), ("c", 1180), ("d", 1305)] {
            let mut player = Player::new(id);
            player.rating = rating;
            store.create_player(&player).await.unwrap();
        }

        let top = service.leaderboard(3).await.unwrap();
        let ratings: Vec<i32> = top.iter().map(|p| p.rating).collect();

        assert_eq!(ratings, vec![1390, 1305, 1210]);
        assert!(service.leaderboard(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repository_failure_is_propagated() {
        let mut repository = MockPlayerRepository::new();
        repository
            .expect_get_player()
            .returning(|_| Err(PlayerRepositoryError::DynamoDb("throttled".to_string())));
        repository.expect_create_player().never();
        repository.expect_update_verification().never();
        let service = PlayerService::new(Arc::new(repository));

        let result = service.register("discord-1", "magnus").await;

        assert!(matches!(
            result,
            Err(PlayerServiceError::RepositoryError(_))
        ));
    }

    #[tokio::test]
    async fn test_relink_during_checkmate_keeps_new_rating() {
        let store = Arc::new(InMemoryStore::new());
        for id in ["alice", "bob"] {
            store.create_player(&Player::new(id)).await.unwrap();
        }
        let sessions = MatchSessionService::new(
            store.clone(),
            store.clone(),
            Arc::new(ChessRulesEngine::new()),
        );
        sessions.start_match("alice", "bob").await.unwrap();
        let opening = [
            ("alice", "e4"),
            ("bob", "e5"),
            ("alice", "Qh5"),
            ("bob", "Nc6"),
            ("alice", "Bc4"),
            ("bob", "Nf6"),
        ];
        for (player, token) in opening {
            sessions.submit_move(player, token).await.unwrap();
        }

        let release = Arc::new(Notify::new());
        let players = PlayerService::new(Arc::new(PausedAfterRead {
            store: store.clone(),
            release: release.clone(),
        }));

        // The re-link reads alice at 1200, then the mate lands before it writes.
        let (relinked, mate) = tokio::join!(players.register("alice", "magnus"), async {
            let outcome = sessions.submit_move("alice", "Qxf7#").await;
            release.notify_one();
            outcome
        });

        assert!(mate.unwrap().is_terminal());
        assert_eq!(relinked.unwrap().rating, 1216);
        let stored = store.get_player("alice").await.unwrap().unwrap();
        assert_eq!(stored.rating, 1216);
        assert_eq!(stored.linked_handle.as_deref(), Some("magnus"));
        assert!(!stored.verified);
    }
}
