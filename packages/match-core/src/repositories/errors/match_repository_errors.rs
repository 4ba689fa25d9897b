#[derive(Debug)]
pub enum MatchRepositoryError {
    /// A conditional write lost against a concurrent writer.
    Conflict(String),
    Serialization(String),
    DynamoDb(String),
    TransactionError(String),
    Unavailable(String),
}

impl std::fmt::Display for MatchRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRepositoryError::Conflict(match_id) => {
                write!(f, "Match {} was modified concurrently", match_id)
            }
            MatchRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
            MatchRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            MatchRepositoryError::TransactionError(msg) => {
                write!(f, "Transaction error: {}", msg)
            }
            MatchRepositoryError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for MatchRepositoryError {}
