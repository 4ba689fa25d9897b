#[derive(Debug)]
pub enum PlayerRepositoryError {
    AlreadyExists(String),
    NotFound(String),
    Serialization(String),
    DynamoDb(String),
    Unavailable(String),
}

impl std::fmt::Display for PlayerRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerRepositoryError::AlreadyExists(id) => write!(f, "Player {} already exists", id),
            PlayerRepositoryError::NotFound(id) => write!(f, "Player {} not found", id),
            PlayerRepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            PlayerRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            PlayerRepositoryError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for PlayerRepositoryError {}
