use crate::models::player::Player;
use crate::repositories::errors::player_repository_errors::PlayerRepositoryError;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};
use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;

pub struct DynamoDbPlayerRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbPlayerRepository {
    pub fn new(client: Client, table_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    async fn get_player(&self, external_id: &str) -> Result<Option<Player>, PlayerRepositoryError>;

    /// Fails with `AlreadyExists` if the id is taken.
    async fn create_player(&self, player: &Player) -> Result<(), PlayerRepositoryError>;

    /// Writes the handle and verification fields of an existing player and
    /// returns the stored record. The rating is never touched here.
    async fn update_verification(&self, player: &Player) -> Result<Player, PlayerRepositoryError>;

    /// Highest rated first.
    async fn top_players(&self, limit: usize) -> Result<Vec<Player>, PlayerRepositoryError>;
}

#[async_trait]
impl PlayerRepository for DynamoDbPlayerRepository {
    async fn get_player(&self, external_id: &str) -> Result<Option<Player>, PlayerRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("external_id", AttributeValue::S(external_id.to_string()))
            .send()
            .await
            .map_err(|e| PlayerRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                let player: Player = from_item(item)
                    .map_err(|e| PlayerRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(player))
            }
            None => Ok(None),
        }
    }

    async fn create_player(&self, player: &Player) -> Result<(), PlayerRepositoryError> {
        let item =
            to_item(player).map_err(|e| PlayerRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(external_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(PlayerRepositoryError::AlreadyExists(
                            player.external_id.clone(),
                        ));
                    }
                }
                Err(PlayerRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn update_verification(&self, player: &Player) -> Result<Player, PlayerRepositoryError> {
        let serialize = |e: serde_dynamo::Error| PlayerRepositoryError::Serialization(e.to_string());

        let output = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("external_id", AttributeValue::S(player.external_id.clone()))
            .update_expression(
                "SET linked_handle = :linked_handle, verification_token = :verification_token, \
                 verified = :verified, updated_at = :updated_at",
            )
            .condition_expression("attribute_exists(external_id)")
            .expression_attribute_values(
                ":linked_handle",
                to_attribute_value(&player.linked_handle).map_err(serialize)?,
            )
            .expression_attribute_values(
                ":verification_token",
                to_attribute_value(&player.verification_token).map_err(serialize)?,
            )
            .expression_attribute_values(":verified", AttributeValue::Bool(player.verified))
            .expression_attribute_values(
                ":updated_at",
                to_attribute_value(player.updated_at).map_err(serialize)?,
            )
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match output {
            Ok(output) => match output.attributes {
                Some(item) => from_item(item).map_err(serialize),
                None => Err(PlayerRepositoryError::NotFound(player.external_id.clone())),
            },
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(PlayerRepositoryError::NotFound(player.external_id.clone()));
                    }
                }
                Err(PlayerRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn top_players(&self, limit: usize) -> Result<Vec<Player>, PlayerRepositoryError> {
        // The player table is small and has no rating index, so rank client-side.
        let mut players = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| PlayerRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let player: Player = from_item(item)
                    .map_err(|e| PlayerRepositoryError::Serialization(e.to_string()))?;
                players.push(player);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        players.sort_by(|a, b| b.rating.cmp(&a.rating));
        players.truncate(limit);
        Ok(players)
    }
}
