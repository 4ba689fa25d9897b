use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RATING: i32 = 1200;

/// A registered player, keyed by their chat-platform identity.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Player {
    pub external_id: String,
    pub linked_handle: Option<String>,
    pub verification_token: Option<String>,
    pub verified: bool,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn new(external_id: &str) -> Self {
        let now = Utc::now();
        Player {
            external_id: external_id.to_string(),
            linked_handle: None,
            verification_token: None,
            verified: false,
            rating: DEFAULT_RATING,
            created_at: now,
            updated_at: now,
        }
    }

    /// Links an external-service handle and resets verification against a fresh token.
    pub fn link_handle(&mut self, handle: &str, token: String) {
        self.linked_handle = Some(handle.to_string());
        self.verification_token = Some(token);
        self.verified = false;
        self.updated_at = Utc::now();
    }

    pub fn mark_verified(&mut self) {
        self.verified = true;
        self.verification_token = None;
        self.updated_at = Utc::now();
    }

    pub fn set_rating(&mut self, rating: i32) {
        self.rating = rating;
        self.updated_at = Utc::now();
    }
}
