//! Centipawn loss and move classification (pure functions only)

use serde::{Deserialize, Serialize};

/// Classification thresholds (centipawn loss)
const THRESHOLD_BEST: i32 = 0;
const THRESHOLD_EXCELLENT: i32 = 10;
const THRESHOLD_GOOD: i32 = 50;
const THRESHOLD_INACCURACY: i32 = 100;
const THRESHOLD_MISTAKE: i32 = 200;

/// Both evaluations of one move, from the mover's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveLoss {
    pub eval_before: i32,
    pub eval_after: i32,
    pub centipawn_loss: i32,
    /// Either evaluation was absent; the absent side is stored as 0.
    pub evaluation_missing: bool,
}

/// Loss of a move given the mover's evaluation before it and the engine's raw
/// evaluation after it (opponent to move).
///
/// `max(0, before - (-after_raw))`. A missing evaluation on either side
/// yields zero loss.
pub fn centipawn_loss(before: Option<i32>, after_raw: Option<i32>) -> MoveLoss {
    let after = after_raw.map(i32::saturating_neg);
    match (before, after) {
        (Some(before), Some(after)) => MoveLoss {
            eval_before: before,
            eval_after: after,
            centipawn_loss: before.saturating_sub(after).max(0),
            evaluation_missing: false,
        },
        (before, after) => MoveLoss {
            eval_before: before.unwrap_or(0),
            eval_after: after.unwrap_or(0),
            centipawn_loss: 0,
            evaluation_missing: true,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Best,
    Excellent,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
}

pub fn classify(cp_loss: i32) -> Classification {
    if cp_loss <= THRESHOLD_BEST {
        Classification::Best
    } else if cp_loss < THRESHOLD_EXCELLENT {
        Classification::Excellent
    } else if cp_loss < THRESHOLD_GOOD {
        Classification::Good
    } else if cp_loss < THRESHOLD_INACCURACY {
        Classification::Inaccuracy
    } else if cp_loss < THRESHOLD_MISTAKE {
        Classification::Mistake
    } else {
        Classification::Blunder
    }
}

pub fn calculate_accuracy(total_cp_loss: i64, move_count: u32) -> f64 {
    if move_count == 0 {
        return 100.0;
    }
    let acpl = total_cp_loss as f64 / move_count as f64;
    let accuracy = 100.0 * (1.0 / (1.0 + acpl / 100.0)).sqrt();
    accuracy.clamp(0.0, 100.0)
}
