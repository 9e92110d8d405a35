use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl From<shakmaty::Color> for Side {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Side::White,
            shakmaty::Color::Black => Side::Black,
        }
    }
}

/// A board state reached while replaying a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Number of half-moves played before this position (0 = start).
    pub index: usize,
    pub fen: String,
    pub side_to_move: Side,
}

/// A single played half-move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// 1-indexed half-move number
    pub number: usize,
    pub uci: String,
    pub san: String,
    pub mover: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ply {
    pub before: Position,
    pub played: Move,
    pub after: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub start: Position,
    pub plies: Vec<Ply>,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
}

impl GameRecord {
    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    /// Position after the last move (the start position for an empty game).
    pub fn final_position(&self) -> &Position {
        self.plies.last().map(|p| &p.after).unwrap_or(&self.start)
    }
}
