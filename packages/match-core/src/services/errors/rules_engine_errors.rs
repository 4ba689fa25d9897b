use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesEngineError {
    IllegalMove(String),
    InvalidPosition(String),
}

impl fmt::Display for RulesEngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RulesEngineError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
            RulesEngineError::InvalidPosition(msg) => write!(f, "Invalid position: {}", msg),
        }
    }
}

impl std::error::Error for RulesEngineError {}
