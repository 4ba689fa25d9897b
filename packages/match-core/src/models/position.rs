use serde::{Deserialize, Serialize};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A board state as handed to and returned from the rules engine.
///
/// `fen` carries accurate half-move and full-move clocks. `repetition_keys`
/// lists the repetition key of every position reached since the last capture
/// or pawn move, current position included, so threefold repetition can be
/// judged without any move history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Position {
    pub fen: String,
    pub repetition_keys: Vec<String>,
}

impl Position {
    pub fn new(fen: String, repetition_keys: Vec<String>) -> Self {
        Position {
            fen,
            repetition_keys,
        }
    }

    /// Builds a position with an empty ledger apart from itself.
    pub fn from_fen(fen: &str) -> Self {
        Position {
            fen: fen.to_string(),
            repetition_keys: vec![repetition_key(fen)],
        }
    }

    pub fn halfmove_clock(&self) -> u32 {
        fen_field(&self.fen, 4).unwrap_or(0)
    }

    pub fn fullmove_number(&self) -> u32 {
        fen_field(&self.fen, 5).unwrap_or(1)
    }

    /// Number of times the current position has occurred in the ledger.
    pub fn occurrences(&self) -> usize {
        let key = repetition_key(&self.fen);
        self.repetition_keys.iter().filter(|k| **k == key).count()
    }
}

/// Piece placement, side to move, castling rights and en passant square.
pub fn repetition_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn fen_field(fen: &str, index: usize) -> Option<u32> {
    fen.split_whitespace().nth(index).and_then(|s| s.parse().ok())
}
