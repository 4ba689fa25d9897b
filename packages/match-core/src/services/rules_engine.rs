use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Square};
use std::str::FromStr;

use crate::{
    models::position::{repetition_key, Position},
    services::errors::rules_engine_errors::RulesEngineError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Ongoing,
    Checkmate,
    Stalemate,
    /// One hundred half-moves without a capture or pawn move.
    FiftyMoveRule,
    InsufficientMaterial,
    Repetition,
}

/// Move validation and terminal detection over explicit positions.
///
/// Implementations hold no board of their own; every call takes the position
/// it works on and returns a new one.
pub trait RulesEngine: Send + Sync {
    fn initial_position(&self) -> Position;

    fn apply_move(&self, position: &Position, token: &str) -> Result<Position, RulesEngineError>;

    fn terminal_status(&self, position: &Position) -> Result<TerminalStatus, RulesEngineError>;
}

#[derive(Clone, Default)]
pub struct ChessRulesEngine;

impl ChessRulesEngine {
    pub fn new() -> Self {
        ChessRulesEngine
    }

    fn parse_board(fen: &str) -> Result<Board, RulesEngineError> {
        Board::from_str(fen)
            .map_err(|e| RulesEngineError::InvalidPosition(format!("Invalid FEN: {}", e)))
    }

    /// Resolves a move token against the legal moves of `board`.
    ///
    /// Accepts coordinate notation (`e2e4`, `e2-e4`, `e7e8q`) and SAN with or
    /// without check, capture and promotion markers (`Nf3`, `exd5`, `e8=Q+`,
    /// `O-O`, `0-0-0`).
    fn resolve_move(board: &Board, token: &str) -> Result<ChessMove, RulesEngineError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RulesEngineError::IllegalMove("Empty move".to_string()));
        }

        let legal_moves: Vec<ChessMove> = MoveGen::new_legal(board).collect();

        if let Some(candidate) = parse_coordinate_move(token) {
            if legal_moves.contains(&candidate) {
                return Ok(candidate);
            }
        }

        let wanted = normalize_san(token);
        let matching: Vec<ChessMove> = legal_moves
            .into_iter()
            .filter(|m| san_candidates(board, *m).contains(&wanted))
            .collect();

        match matching.as_slice() {
            [only] => Ok(*only),
            [] => Err(RulesEngineError::IllegalMove(format!(
                "{} is not a legal move",
                token
            ))),
            _ => Err(RulesEngineError::IllegalMove(format!(
                "{} is ambiguous",
                token
            ))),
        }
    }
}

impl RulesEngine for ChessRulesEngine {
    fn initial_position(&self) -> Position {
        let fen = format!("{} 0 1", repetition_key(&Board::default().to_string()));
        Position::from_fen(&fen)
    }

    fn apply_move(&self, position: &Position, token: &str) -> Result<Position, RulesEngineError> {
        let board = Self::parse_board(&position.fen)?;
        if board.status() != BoardStatus::Ongoing {
            return Err(RulesEngineError::IllegalMove(
                "No moves are possible in this position".to_string(),
            ));
        }

        let chess_move = Self::resolve_move(&board, token)?;
        let irreversible = board.piece_on(chess_move.get_source()) == Some(Piece::Pawn)
            || board.piece_on(chess_move.get_dest()).is_some();
        let next_board = board.make_move_new(chess_move);

        let halfmove_clock = if irreversible {
            0
        } else {
            position.halfmove_clock() + 1
        };
        let fullmove_number = match board.side_to_move() {
            Color::Black => position.fullmove_number() + 1,
            Color::White => position.fullmove_number(),
        };

        let key = repetition_key(&next_board.to_string());
        let fen = format!("{} {} {}", key, halfmove_clock, fullmove_number);

        let mut repetition_keys = if irreversible {
            Vec::new()
        } else {
            position.repetition_keys.clone()
        };
        repetition_keys.push(key);

        Ok(Position::new(fen, repetition_keys))
    }

    fn terminal_status(&self, position: &Position) -> Result<TerminalStatus, RulesEngineError> {
        let board = Self::parse_board(&position.fen)?;

        let status = match board.status() {
            BoardStatus::Checkmate => TerminalStatus::Checkmate,
            BoardStatus::Stalemate => TerminalStatus::Stalemate,
            BoardStatus::Ongoing => {
                if has_insufficient_material(&board) {
                    TerminalStatus::InsufficientMaterial
                } else if position.occurrences() >= 3 {
                    TerminalStatus::Repetition
                } else if position.halfmove_clock() >= 100 {
                    TerminalStatus::FiftyMoveRule
                } else {
                    TerminalStatus::Ongoing
                }
            }
        };

        Ok(status)
    }
}

fn parse_coordinate_move(token: &str) -> Option<ChessMove> {
    let token: String = token
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();
    if !token.is_ascii() || !(token.len() == 4 || token.len() == 5) {
        return None;
    }

    let from_sq = Square::from_str(&token[0..2]).ok()?;
    let to_sq = Square::from_str(&token[2..4]).ok()?;
    let promotion = match token.chars().nth(4) {
        Some('q') => Some(Piece::Queen),
        Some('r') => Some(Piece::Rook),
        Some('b') => Some(Piece::Bishop),
        Some('n') => Some(Piece::Knight),
        Some(_) => return None,
        None => None,
    };

    Some(ChessMove::new(from_sq, to_sq, promotion))
}

fn normalize_san(token: &str) -> String {
    let stripped: String = token
        .replace("e.p.", "")
        .chars()
        .filter(|c| !matches!(c, '+' | '#' | '!' | '?' | 'x' | 'X' | '=' | ':' | ' '))
        .collect();

    let castle = stripped.replace('0', "O").to_ascii_uppercase();
    if castle == "O-O" || castle == "O-O-O" {
        return castle;
    }

    let mut chars: Vec<char> = stripped.chars().collect();
    let len = chars.len();
    if len >= 3 && chars[len - 2].is_ascii_digit() && "qrbn".contains(chars[len - 1]) {
        chars[len - 1] = chars[len - 1].to_ascii_uppercase();
    }
    chars.into_iter().collect()
}

/// Every spelling of `chess_move` that normalized SAN input may take.
fn san_candidates(board: &Board, chess_move: ChessMove) -> Vec<String> {
    let from = chess_move.get_source();
    let to = chess_move.get_dest();
    let promotion = chess_move
        .get_promotion()
        .map(piece_letter)
        .unwrap_or_default();

    let from_file = from.get_file().to_index();
    let to_file = to.get_file().to_index();

    match board.piece_on(from) {
        Some(Piece::King) if from_file.abs_diff(to_file) == 2 => {
            if to_file > from_file {
                vec!["O-O".to_string()]
            } else {
                vec!["O-O-O".to_string()]
            }
        }
        Some(Piece::Pawn) => {
            if from.get_file() == to.get_file() {
                vec![format!("{}{}", to, promotion)]
            } else {
                vec![format!("{}{}{}", file_char(from), to, promotion)]
            }
        }
        Some(piece) => {
            let letter = piece_letter(piece);
            vec![
                format!("{}{}", letter, to),
                format!("{}{}{}", letter, file_char(from), to),
                format!("{}{}{}", letter, rank_char(from), to),
                format!("{}{}{}", letter, from, to),
            ]
        }
        None => Vec::new(),
    }
}

fn piece_letter(piece: Piece) -> String {
    match piece {
        Piece::Pawn => "",
        Piece::Knight => "N",
        Piece::Bishop => "B",
        Piece::Rook => "R",
        Piece::Queen => "Q",
        Piece::King => "K",
    }
    .to_string()
}

fn file_char(square: Square) -> char {
    (b'a' + square.get_file().to_index() as u8) as char
}

fn rank_char(square: Square) -> char {
    (b'1' + square.get_rank().to_index() as u8) as char
}

/// Bare kings, a single minor piece, or bishops all on one square colour.
fn has_insufficient_material(board: &Board) -> bool {
    let heavy =
        *board.pieces(Piece::Pawn) | *board.pieces(Piece::Rook) | *board.pieces(Piece::Queen);
    if heavy.popcnt() > 0 {
        return false;
    }

    if board.combined().popcnt() <= 3 {
        return true;
    }

    if board.pieces(Piece::Knight).popcnt() > 0 {
        return false;
    }

    let mut bishop_colours = (*board.pieces(Piece::Bishop))
        .map(|sq| (sq.get_rank().to_index() + sq.get_file().to_index()) % 2);
    match bishop_colours.next() {
        Some(first) => bishop_colours.all(|colour| colour == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::position::STARTING_FEN;
    use rstest::rstest;

    fn engine() -> ChessRulesEngine {
        ChessRulesEngine::new()
    }

    fn play(engine: &ChessRulesEngine, position: Position, tokens: &[&str]) -> Position {
        tokens.iter().fold(position, |current, token| {
            engine.apply_move(&current, token).unwrap()
        })
    }

    #[test]
    fn test_initial_position_is_standard_start() {
        let position = engine().initial_position();

        assert_eq!(position.fen, STARTING_FEN);
        assert_eq!(position.repetition_keys.len(), 1);
    }

    #[rstest]
    #[case("e4")]
    #[case("e2e4")]
    #[case("e2-e4")]
    #[case("E2E4")]
    fn test_pawn_push_notations_agree(#[case] token: &str) {
        let engine = engine();
        let next = engine.apply_move(&engine.initial_position(), token).unwrap();

        assert!(next
            .fen
            .starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq"));
        assert!(next.fen.ends_with(" 0 1"));
        assert!(next.repetition_keys.len() == 1, "pawn moves reset the ledger");
    }

    #[rstest]
    #[case("Nf3")]
    #[case("g1f3")]
    #[case("Ngf3")]
    #[case("Ng1f3")]
    fn test_knight_move_notations_agree(#[case] token: &str) {
        let engine = engine();
        let next = engine.apply_move(&engine.initial_position(), token).unwrap();

        assert!(next
            .fen
            .starts_with("rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq"));
        assert!(next.fen.ends_with(" 1 1"));
        assert_eq!(next.repetition_keys.len(), 2);
    }

    #[rstest]
    #[case("e5")]
    #[case("Ke2")]
    #[case("Nf6")]
    #[case("e2e5")]
    #[case("xyz")]
    #[case("")]
    #[case("   ")]
    #[case("♞f3")]
    fn test_illegal_tokens_are_rejected(#[case] token: &str) {
        let engine = engine();
        let result = engine.apply_move(&engine.initial_position(), token);

        assert!(matches!(result, Err(RulesEngineError::IllegalMove(_))));
    }

    #[test]
    fn test_clocks_advance() {
        let engine = engine();
        let position = play(&engine, engine.initial_position(), &["Nf3", "Nf6"]);

        assert_eq!(position.halfmove_clock(), 2);
        assert_eq!(position.fullmove_number(), 2);

        let position = play(&engine, position, &["e4"]);
        assert_eq!(position.halfmove_clock(), 0);
        assert_eq!(position.fullmove_number(), 2);
    }

    #[rstest]
    #[case("a8=Q")]
    #[case("a8Q")]
    #[case("a8q")]
    #[case("a7a8q")]
    fn test_promotion(#[case] token: &str) {
        let engine = engine();
        let position = Position::from_fen("8/P7/8/8/8/8/8/K6k w - - 0 1");

        let next = engine.apply_move(&position, token).unwrap();

        assert!(next.fen.starts_with("Q7/8/8/8/8/8/8/K6k b"));
    }

    #[test]
    fn test_promotion_requires_piece() {
        let engine = engine();
        let position = Position::from_fen("8/P7/8/8/8/8/8/K6k w - - 0 1");

        let result = engine.apply_move(&position, "a7a8");

        assert!(matches!(result, Err(RulesEngineError::IllegalMove(_))));
    }

    #[rstest]
    #[case("O-O")]
    #[case("0-0")]
    #[case("e1g1")]
    fn test_kingside_castle(#[case] token: &str) {
        let engine = engine();
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");

        let next = engine.apply_move(&position, token).unwrap();

        assert!(next.fen.starts_with("r3k2r/8/8/8/8/8/8/R4RK1 b kq"));
    }

    #[test]
    fn test_queenside_castle() {
        let engine = engine();
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");

        let next = engine.apply_move(&position, "O-O-O").unwrap();

        assert!(next.fen.starts_with("r3k2r/8/8/8/8/8/8/2KR3R b kq"));
    }

    #[test]
    fn test_ambiguous_san_is_rejected() {
        let engine = engine();
        // Both rooks can reach d1.
        let position = Position::from_fen("4k3/8/8/8/8/8/4K3/R6R w - - 0 1");

        let ambiguous = engine.apply_move(&position, "Rd1");
        let explicit = engine.apply_move(&position, "Rad1");

        assert!(matches!(ambiguous, Err(RulesEngineError::IllegalMove(_))));
        assert!(explicit.is_ok());
    }

    #[test]
    fn test_invalid_fen_is_reported() {
        let engine = engine();
        let position = Position::from_fen("not a board");

        assert!(matches!(
            engine.apply_move(&position, "e4"),
            Err(RulesEngineError::InvalidPosition(_))
        ));
        assert!(matches!(
            engine.terminal_status(&position),
            Err(RulesEngineError::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_scholars_mate_is_checkmate() {
        let engine = engine();
        let position = play(
            &engine,
            engine.initial_position(),
            &["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"],
        );

        assert_eq!(
            engine.terminal_status(&position).unwrap(),
            TerminalStatus::Checkmate
        );
        assert!(engine.apply_move(&position, "Ke7").is_err());
    }

    #[rstest]
    #[case::start(STARTING_FEN, TerminalStatus::Ongoing)]
    #[case::stalemate("7k/5K2/6Q1/8/8/8/8/8 b - - 0 1", TerminalStatus::Stalemate)]
    #[case::bare_kings("k7/8/8/8/8/8/8/4K3 w - - 0 1", TerminalStatus::InsufficientMaterial)]
    #[case::lone_knight("k7/8/8/8/8/8/8/4KN2 w - - 0 1", TerminalStatus::InsufficientMaterial)]
    #[case::lone_bishop("k7/8/8/8/8/8/8/2B1K3 w - - 0 1", TerminalStatus::InsufficientMaterial)]
    #[case::same_colour_bishops("k4b2/8/8/8/8/8/8/2B1K3 w - - 0 1", TerminalStatus::InsufficientMaterial)]
    #[case::opposite_colour_bishops("k1b5/8/8/8/8/8/8/2B1K3 w - - 0 1", TerminalStatus::Ongoing)]
    #[case::two_knights("k7/8/8/8/8/8/8/1N2KN2 w - - 0 1", TerminalStatus::Ongoing)]
    #[case::lone_rook("k7/8/8/8/8/8/8/4K2R w - - 0 1", TerminalStatus::Ongoing)]
    #[case::fifty_moves("k7/8/8/8/8/8/8/4K2R b - - 100 80", TerminalStatus::FiftyMoveRule)]
    #[case::ninety_nine("k7/8/8/8/8/8/8/4K2R b - - 99 80", TerminalStatus::Ongoing)]
    fn test_terminal_status(#[case] fen: &str, #[case] expected: TerminalStatus) {
        let position = Position::from_fen(fen);

        assert_eq!(engine().terminal_status(&position).unwrap(), expected);
    }

    #[test]
    fn test_threefold_repetition() {
        let engine = engine();
        let shuffle = ["Nf3", "Nf6", "Ng1", "Ng8"];

        let once = play(&engine, engine.initial_position(), &shuffle);
        assert_eq!(once.occurrences(), 2);
        assert_eq!(
            engine.terminal_status(&once).unwrap(),
            TerminalStatus::Ongoing
        );

        let twice = play(&engine, once, &shuffle);
        assert_eq!(twice.occurrences(), 3);
        assert_eq!(
            engine.terminal_status(&twice).unwrap(),
            TerminalStatus::Repetition
        );
    }

    #[test]
    fn test_apply_move_does_not_touch_input() {
        let engine = engine();
        let start = engine.initial_position();
        let snapshot = start.clone();

        let _ = engine.apply_move(&start, "e4").unwrap();
        let _ = engine.apply_move(&start, "e5");

        assert_eq!(start, snapshot);
    }
}
