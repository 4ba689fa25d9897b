pub mod chess_match;
pub mod outcome;
pub mod player;
pub mod position;
