use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, CancellationReason, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};
use std::collections::HashMap;
use tracing::warn;

use crate::models::chess_match::Match;
use crate::models::outcome::RatingChange;
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;

#[cfg(test)]
use mockall::automock;

const PLAYER1_INDEX: &str = "GSI_MatchByPlayer1";
const PLAYER2_INDEX: &str = "GSI_MatchByPlayer2";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// The active match `player_id` is playing in, on either side.
    async fn find_active_match_for(
        &self,
        player_id: &str,
    ) -> Result<Option<Match>, MatchRepositoryError>;

    /// Fails with `Conflict` if a match with the same id already exists.
    async fn create_match(&self, record: &Match) -> Result<(), MatchRepositoryError>;

    /// Replaces the stored match, provided its version is still `expected_version`.
    async fn update_match(
        &self,
        record: &Match,
        expected_version: u64,
    ) -> Result<(), MatchRepositoryError>;

    /// Writes a decisive result and both players' new ratings in one
    /// transaction. Each rating is only replaced if it still holds the
    /// `before` value in `ratings`; no other player field is written.
    async fn complete_decisive_match(
        &self,
        record: &Match,
        expected_version: u64,
        winner_id: &str,
        loser_id: &str,
        ratings: &RatingChange,
    ) -> Result<(), MatchRepositoryError>;
}

pub struct DynamoDbMatchRepository {
    pub client: Client,
    pub table_name: String,
    pub players_table_name: String,
}

impl DynamoDbMatchRepository {
    pub fn new(client: Client, table_name: &str, players_table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            players_table_name: players_table_name.to_string(),
        }
    }

    async fn query_active(
        &self,
        index_name: &str,
        key_attribute: &str,
        player_id: &str,
    ) -> Result<Vec<Match>, MatchRepositoryError> {
        let mut matches = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        // The filter runs per page, so an empty page does not mean no match.
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(index_name)
                .key_condition_expression("#player = :player_id")
                .filter_expression("#active = :active")
                .expression_attribute_names("#player", key_attribute)
                .expression_attribute_names("#active", "active")
                .expression_attribute_values(
                    ":player_id",
                    AttributeValue::S(player_id.to_string()),
                )
                .expression_attribute_values(":active", AttributeValue::Bool(true))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| MatchRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let record: Match = from_item(item)
                    .map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;
                matches.push(record);
            }

            start_key = next_page(output.last_evaluated_key);
            if start_key.is_none() {
                break;
            }
        }
        Ok(matches)
    }

    fn versioned_put(
        &self,
        record: &Match,
        expected_version: u64,
    ) -> Result<Put, MatchRepositoryError> {
        let item =
            to_item(record).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;
        Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("#version = :expected_version")
            .expression_attribute_names("#version", "version")
            .expression_attribute_values(
                ":expected_version",
                AttributeValue::N(expected_version.to_string()),
            )
            .build()
            .map_err(|e| MatchRepositoryError::TransactionError(e.to_string()))
    }

    fn rating_update(
        &self,
        player_id: &str,
        before: i32,
        after: i32,
    ) -> Result<Update, MatchRepositoryError> {
        let updated_at = to_attribute_value(Utc::now())
            .map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;
        Update::builder()
            .table_name(&self.players_table_name)
            .key("external_id", AttributeValue::S(player_id.to_string()))
            .update_expression("SET rating = :after, updated_at = :updated_at")
            .condition_expression("rating = :before")
            .expression_attribute_values(":before", AttributeValue::N(before.to_string()))
            .expression_attribute_values(":after", AttributeValue::N(after.to_string()))
            .expression_attribute_values(":updated_at", updated_at)
            .build()
            .map_err(|e| MatchRepositoryError::TransactionError(e.to_string()))
    }
}

/// The key to resume a query from, or `None` once the last page is read.
fn next_page(
    last_evaluated_key: Option<HashMap<String, AttributeValue>>,
) -> Option<HashMap<String, AttributeValue>> {
    last_evaluated_key.filter(|key| !key.is_empty())
}

/// True when a cancelled transaction lost on one of its conditions, as
/// opposed to throttling, validation or conflicting in-flight transactions.
fn failed_on_condition(reasons: &[CancellationReason]) -> bool {
    reasons
        .iter()
        .any(|reason| reason.code() == Some("ConditionalCheckFailed"))
}

#[async_trait]
impl MatchRepository for DynamoDbMatchRepository {
    async fn find_active_match_for(
        &self,
        player_id: &str,
    ) -> Result<Option<Match>, MatchRepositoryError> {
        let mut matches = self
            .query_active(PLAYER1_INDEX, "player1_id", player_id)
            .await?;
        matches.extend(
            self.query_active(PLAYER2_INDEX, "player2_id", player_id)
                .await?,
        );

        if matches.len() > 1 {
            warn!(
                "Player {} has {} active matches; using the most recently updated",
                player_id,
                matches.len()
            );
        }

        Ok(matches.into_iter().max_by_key(|record| record.updated_at))
    }

    async fn create_match(&self, record: &Match) -> Result<(), MatchRepositoryError> {
        let item =
            to_item(record).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(match_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(MatchRepositoryError::Conflict(record.match_id.clone()));
                    }
                }
                Err(MatchRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn update_match(
        &self,
        record: &Match,
        expected_version: u64,
    ) -> Result<(), MatchRepositoryError> {
        let item =
            to_item(record).map_err(|e| MatchRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("#version = :expected_version")
            .expression_attribute_names("#version", "version")
            .expression_attribute_values(
                ":expected_version",
                AttributeValue::N(expected_version.to_string()),
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(MatchRepositoryError::Conflict(record.match_id.clone()));
                    }
                }
                Err(MatchRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn complete_decisive_match(
        &self,
        record: &Match,
        expected_version: u64,
        winner_id: &str,
        loser_id: &str,
        ratings: &RatingChange,
    ) -> Result<(), MatchRepositoryError> {
        let transaction_items = vec![
            TransactWriteItem::builder()
                .put(self.versioned_put(record, expected_version)?)
                .build(),
            TransactWriteItem::builder()
                .update(self.rating_update(
                    winner_id,
                    ratings.winner_before,
                    ratings.winner_after,
                )?)
                .build(),
            TransactWriteItem::builder()
                .update(self.rating_update(
                    loser_id,
                    ratings.loser_before,
                    ratings.loser_after,
                )?)
                .build(),
        ];

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(transaction_items))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if let TransactWriteItemsError::TransactionCanceledException(cancelled) =
                        service_err.err()
                    {
                        if failed_on_condition(cancelled.cancellation_reasons()) {
                            return Err(MatchRepositoryError::Conflict(record.match_id.clone()));
                        }
                    }
                }
                Err(MatchRepositoryError::TransactionError(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(code: &str) -> CancellationReason {
        CancellationReason::builder().code(code).build()
    }

    #[test]
    fn test_paging_continues_while_a_key_is_returned() {
        let key = HashMap::from([(
            "match_id".to_string(),
            AttributeValue::S("m-1".to_string()),
        )]);

        assert_eq!(next_page(Some(key.clone())), Some(key));
        assert_eq!(next_page(Some(HashMap::new())), None);
        assert_eq!(next_page(None), None);
    }

    #[test]
    fn test_condition_failure_is_detected_among_reasons() {
        let reasons = vec![reason("None"), reason("ConditionalCheckFailed"), reason("None")];

        assert!(failed_on_condition(&reasons));
    }

    #[test]
    fn test_other_cancellations_are_not_conflicts() {
        let throttled = vec![reason("ThrottlingError"), reason("None"), reason("None")];
        let invalid = vec![reason("ValidationError")];

        assert!(!failed_on_condition(&throttled));
        assert!(!failed_on_condition(&invalid));
        assert!(!failed_on_condition(&[]));
    }
}
