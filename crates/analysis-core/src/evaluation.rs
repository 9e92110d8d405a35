//! Chess position evaluation types.

use chess_core::Side;
use serde::{Deserialize, Serialize};

/// Score as reported by a UCI engine (side to move's point of view).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawn evaluation
    Centipawns(i32),
    /// Mate in N moves (negative = side to move gets mated, 0 = already mated)
    Mate(i32),
}

impl Score {
    /// Collapse to centipawns, mapping mates onto `±mate_score` shortened by the distance.
    ///
    /// Mate in +n → `mate_score - n`, mate in -n → `-mate_score + n`,
    /// mate 0 → `-mate_score`.
    pub fn to_centipawns(self, mate_score: i32) -> i32 {
        match self {
            Score::Centipawns(cp) => cp,
            Score::Mate(n) if n > 0 => mate_score - n.min(mate_score - 1),
            Score::Mate(n) => -mate_score - n.max(-(mate_score - 1)),
        }
    }
}

/// A normalized evaluation of one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationScore {
    /// Side to move in the evaluated position
    pub perspective: Side,
    /// None when the engine gave no score
    pub centipawns: Option<i32>,
    pub mate_in: Option<i32>,
    pub best_move: Option<String>,
    /// Search depth the score came from
    pub depth: Option<u32>,
}

impl EvaluationScore {
    pub fn from_score(perspective: Side, score: Option<Score>, mate_score: i32) -> Self {
        Self {
            perspective,
            centipawns: score.map(|s| s.to_centipawns(mate_score)),
            mate_in: match score {
                Some(Score::Mate(n)) => Some(n),
                _ => None,
            },
            best_move: None,
            depth: None,
        }
    }

    pub fn with_best_move(mut self, best_move: Option<String>) -> Self {
        self.best_move = best_move;
        self
    }

    pub fn with_depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    /// Centipawns from `side`'s point of view.
    pub fn centipawns_for(&self, side: Side) -> Option<i32> {
        self.centipawns
            .map(|cp| if side == self.perspective { cp } else { cp.saturating_neg() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centipawns_unchanged() {
        assert_eq!(Score::Centipawns(35).to_centipawns(10_000), 35);
        assert_eq!(Score::Centipawns(-150).to_centipawns(10_000), -150);
    }

    #[test]
    fn test_mate_normalization() {
        assert_eq!(Score::Mate(3).to_centipawns(10_000), 9_997);
        assert_eq!(Score::Mate(-2).to_centipawns(10_000), -9_998);
        assert_eq!(Score::Mate(0).to_centipawns(10_000), -10_000);
        assert_eq!(Score::Mate(1).to_centipawns(500), 499);
    }

    #[test]
    fn test_mate_stays_on_its_side() {
        // Very long mates never cross zero
        assert_eq!(Score::Mate(50_000).to_centipawns(10_000), 1);
        assert_eq!(Score::Mate(-50_000).to_centipawns(10_000), -1);
    }

    #[test]
    fn test_perspective_flip() {
        let eval = EvaluationScore::from_score(Side::Black, Some(Score::Centipawns(-30)), 10_000);
        assert_eq!(eval.centipawns_for(Side::Black), Some(-30));
        assert_eq!(eval.centipawns_for(Side::White), Some(30));
        assert_eq!(eval.mate_in, None);
    }

    #[test]
    fn test_missing_score() {
        let eval = EvaluationScore::from_score(Side::White, None, 10_000);
        assert_eq!(eval.centipawns, None);
        assert_eq!(eval.centipawns_for(Side::Black), None);
    }

    #[test]
    fn test_mate_score_keeps_distance() {
        let eval = EvaluationScore::from_score(Side::White, Some(Score::Mate(-1)), 10_000);
        assert_eq!(eval.centipawns, Some(-9_999));
        assert_eq!(eval.mate_in, Some(-1));
    }
}
