pub mod match_repository_errors;
pub mod player_repository_errors;
