pub mod match_session_service_errors;
pub mod player_service_errors;
pub mod rating_errors;
pub mod rules_engine_errors;
