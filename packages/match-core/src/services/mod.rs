pub mod errors;
pub mod match_session_service;
pub mod player_service;
pub mod rating_service;
pub mod rules_engine;
