use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::models::chess_match::Match;
use crate::models::outcome::RatingChange;
use crate::models::player::Player;
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::repositories::errors::player_repository_errors::PlayerRepositoryError;
use crate::repositories::match_repository::MatchRepository;
use crate::repositories::player_repository::PlayerRepository;

#[derive(Default)]
struct StoreState {
    players: HashMap<String, Player>,
    matches: HashMap<String, Match>,
}

/// Process-local store backing both the player directory and the session
/// store. One lock covers both collections, so the decisive-match write is
/// atomic here as well.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, String> {
        self.state
            .lock()
            .map_err(|_| "in-memory store lock poisoned".to_string())
    }

    /// Every match `player_id` has played or is playing, in no particular order.
    pub fn matches_for(&self, player_id: &str) -> Vec<Match> {
        match self.lock() {
            Ok(state) => state
                .matches
                .values()
                .filter(|record| record.involves(player_id))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn get_match(&self, match_id: &str) -> Option<Match> {
        self.lock()
            .ok()
            .and_then(|state| state.matches.get(match_id).cloned())
    }
}

#[async_trait]
impl PlayerRepository for InMemoryStore {
    async fn get_player(&self, external_id: &str) -> Result<Option<Player>, PlayerRepositoryError> {
        let state = self.lock().map_err(PlayerRepositoryError::Unavailable)?;
        Ok(state.players.get(external_id).cloned())
    }

    async fn create_player(&self, player: &Player) -> Result<(), PlayerRepositoryError> {
        let mut state = self.lock().map_err(PlayerRepositoryError::Unavailable)?;
        if state.players.contains_key(&player.external_id) {
            return Err(PlayerRepositoryError::AlreadyExists(
                player.external_id.clone(),
            ));
        }
        state
            .players
            .insert(player.external_id.clone(), player.clone());
        Ok(())
    }

    async fn update_verification(&self, player: &Player) -> Result<Player, PlayerRepositoryError> {
        let mut state = self.lock().map_err(PlayerRepositoryError::Unavailable)?;
        let stored = state
            .players
            .get_mut(&player.external_id)
            .ok_or_else(|| PlayerRepositoryError::NotFound(player.external_id.clone()))?;

        stored.linked_handle = player.linked_handle.clone();
        stored.verification_token = player.verification_token.clone();
        stored.verified = player.verified;
        stored.updated_at = player.updated_at;
        Ok(stored.clone())
    }

    async fn top_players(&self, limit: usize) -> Result<Vec<Player>, PlayerRepositoryError> {
        let state = self.lock().map_err(PlayerRepositoryError::Unavailable)?;
        let mut players: Vec<Player> = state.players.values().cloned().collect();
        players.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        players.truncate(limit);
        Ok(players)
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn find_active_match_for(
        &self,
        player_id: &str,
    ) -> Result<Option<Match>, MatchRepositoryError> {
        let state = self.lock().map_err(MatchRepositoryError::Unavailable)?;
        Ok(state
            .matches
            .values()
            .filter(|record| record.active && record.involves(player_id))
            .max_by_key(|record| record.updated_at)
            .cloned())
    }

    async fn create_match(&self, record: &Match) -> Result<(), MatchRepositoryError> {
        let mut state = self.lock().map_err(MatchRepositoryError::Unavailable)?;
        if state.matches.contains_key(&record.match_id) {
            return Err(MatchRepositoryError::Conflict(record.match_id.clone()));
        }
        state
            .matches
            .insert(record.match_id.clone(), record.clone());
        Ok(())
    }

    async fn update_match(
        &self,
        record: &Match,
        expected_version: u64,
    ) -> Result<(), MatchRepositoryError> {
        let mut state = self.lock().map_err(MatchRepositoryError::Unavailable)?;
        check_version(&state, record, expected_version)?;
        state
            .matches
            .insert(record.match_id.clone(), record.clone());
        Ok(())
    }

    async fn complete_decisive_match(
        &self,
        record: &Match,
        expected_version: u64,
        winner_id: &str,
        loser_id: &str,
        ratings: &RatingChange,
    ) -> Result<(), MatchRepositoryError> {
        let mut state = self.lock().map_err(MatchRepositoryError::Unavailable)?;
        check_version(&state, record, expected_version)?;
        for (player_id, before) in [
            (winner_id, ratings.winner_before),
            (loser_id, ratings.loser_before),
        ] {
            match state.players.get(player_id) {
                Some(player) if player.rating == before => {}
                _ => return Err(MatchRepositoryError::Conflict(record.match_id.clone())),
            }
        }

        state
            .matches
            .insert(record.match_id.clone(), record.clone());
        for (player_id, after) in [
            (winner_id, ratings.winner_after),
            (loser_id, ratings.loser_after),
        ] {
            if let Some(player) = state.players.get_mut(player_id) {
                player.set_rating(after);
            }
        }
        Ok(())
    }
}

fn check_version(
    state: &StoreState,
    record: &Match,
    expected_version: u64,
) -> Result<(), MatchRepositoryError> {
    match state.matches.get(&record.match_id) {
        Some(stored) if stored.version == expected_version => Ok(()),
        _ => Err(MatchRepositoryError::Conflict(record.match_id.clone())),
    }
}
