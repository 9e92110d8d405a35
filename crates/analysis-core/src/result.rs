//! Per-move analysis records and the finished game result.

use chess_core::Side;
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::loss::{calculate_accuracy, Classification};

/// Move output for JSON serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveAnalysis {
    /// 1-based ply number
    pub move_number: usize,
    #[serde(rename = "move")]
    pub move_uci: String,
    pub san: String,
    pub mover: Side,
    /// Mover's perspective
    pub eval_before: i32,
    /// Mover's perspective (engine value negated)
    pub eval_after: i32,
    pub centipawn_loss: i32,
    pub classification: Classification,
    /// Engine's preferred move in the position before this one
    pub best_move: Option<String>,
    /// Depth reached on the position before the move
    pub depth: Option<u32>,
    /// Mate distance after the move, mover's point of view (0 = delivered mate)
    pub mate_in: Option<i32>,
    pub evaluation_missing: bool,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    Complete,
    /// Moves before `stopped_at` were analyzed; `stopped_at` itself failed.
    Partial {
        stopped_at: usize,
        error: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Engine name from the UCI handshake (empty when no engine was needed)
    pub engine: String,
    pub moves: Vec<MoveAnalysis>,
    pub completion: Completion,
    pub summary: GameSummary,
}

impl AnalysisResult {
    pub fn new(engine: String, moves: Vec<MoveAnalysis>, completion: Completion) -> Self {
        let summary = GameSummary::from_moves(&moves);
        Self {
            engine,
            moves,
            completion,
            summary,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Complete
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub moves: u32,
    /// Over moves with both evaluations present
    pub average_centipawn_loss: f64,
    pub accuracy: f64,
    pub inaccuracies: u32,
    pub mistakes: u32,
    pub blunders: u32,
    pub missing_evaluations: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub white: SideSummary,
    pub black: SideSummary,
}

impl GameSummary {
    pub fn from_moves(moves: &[MoveAnalysis]) -> Self {
        Self {
            white: summarize(moves, Side::White),
            black: summarize(moves, Side::Black),
        }
    }

    pub fn side(&self, side: Side) -> &SideSummary {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }
}

fn summarize(moves: &[MoveAnalysis], side: Side) -> SideSummary {
    let mut summary = SideSummary::default();
    let mut total_loss: i64 = 0;
    let mut evaluated: u32 = 0;

    for m in moves.iter().filter(|m| m.mover == side) {
        summary.moves += 1;
        if m.evaluation_missing {
            summary.missing_evaluations += 1;
            continue;
        }
        evaluated += 1;
        total_loss += i64::from(m.centipawn_loss);
        match m.classification {
            Classification::Inaccuracy => summary.inaccuracies += 1,
            Classification::Mistake => summary.mistakes += 1,
            Classification::Blunder => summary.blunders += 1,
            _ => {}
        }
    }

    if evaluated > 0 {
        summary.average_centipawn_loss = total_loss as f64 / evaluated as f64;
    }
    summary.accuracy = calculate_accuracy(total_loss, evaluated);
    summary
}
