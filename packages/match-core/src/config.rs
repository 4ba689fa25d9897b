use crate::services::player_service::DEFAULT_LEADERBOARD_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    InMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub players_table: String,
    pub matches_table: String,
    pub leaderboard_size: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(name) => {
                write!(f, "{} environment variable must be set", name)
            }
            ConfigError::Invalid { name, value } => {
                write!(f, "{} has an invalid value: {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("dynamodb") => StoreBackend::DynamoDb,
            Some("memory") => StoreBackend::InMemory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        // Table names only matter when talking to DynamoDB.
        let table = |name: &'static str| match (lookup(name), store_backend) {
            (Some(value), _) if !value.is_empty() => Ok(value),
            (_, StoreBackend::InMemory) => Ok(String::new()),
            _ => Err(ConfigError::Missing(name)),
        };
        let players_table = table("PLAYERS_TABLE")?;
        let matches_table = table("MATCHES_TABLE")?;

        let leaderboard_size = match lookup("LEADERBOARD_SIZE") {
            None => DEFAULT_LEADERBOARD_SIZE,
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "LEADERBOARD_SIZE",
                value,
            })?,
        };

        Ok(AppConfig {
            store_backend,
            players_table,
            matches_table,
            leaderboard_size,
        })
    }
}
