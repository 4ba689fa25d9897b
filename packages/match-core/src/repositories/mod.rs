pub mod errors;
pub mod in_memory;
pub mod match_repository;
pub mod player_repository;
