//! Day completion score.
//!
//! Integer-only arithmetic; halves round up (away from zero for the
//! non-negative inputs accepted here).

use serde::{Deserialize, Serialize};

/// Score awarded when completed work carried no estimate at all.
pub const UNESTIMATED_COMPLETION_SCORE: i64 = 80;

/// Completion counters a score is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub total_estimated_minutes: i64,
    pub completed_estimated_minutes: i64,
    pub completed_count: i64,
}

/// Computes a 0..=100 score from completion counters.
///
/// Negative inputs are treated as zero.
pub fn score(
    total_estimated_minutes: i64,
    completed_estimated_minutes: i64,
    completed_count: i64,
) -> i64 {
    let total = total_estimated_minutes.max(0);
    let completed = completed_estimated_minutes.max(0);
    if total == 0 {
        return if completed_count > 0 {
            UNESTIMATED_COMPLETION_SCORE
        } else {
            0
        };
    }

    let numerator = i128::from(completed) * 200 + i128::from(total);
    let denominator = i128::from(total) * 2;
    let rounded = numerator / denominator;
    rounded.clamp(0, 100) as i64
}

impl ScoreInput {
    pub fn score(&self) -> i64 {
        score(
            self.total_estimated_minutes,
            self.completed_estimated_minutes,
            self.completed_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::score;

    #[test]
    fn boundary_cases() {
        assert_eq!(score(0, 0, 0), 0);
        assert_eq!(score(0, 0, 3), 80);
        assert_eq!(score(100, 50, 1), 50);
        assert_eq!(score(100, 100, 4), 100);
        assert_eq!(score(100, 0, 0), 0);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(score(30, 10, 1), 33);
        assert_eq!(score(30, 20, 1), 67);
        assert_eq!(score(8, 1, 1), 13);
        assert_eq!(score(200, 1, 1), 1);
        assert_eq!(score(400, 1, 1), 0);
        assert_eq!(score(3, 2, 1), 67);
    }

    #[test]
    fn result_is_clamped() {
        assert_eq!(score(10, 50, 1), 100);
        assert_eq!(score(10, -5, 1), 0);
        assert_eq!(score(-10, 5, 0), 0);
        assert_eq!(score(i64::MAX, i64::MAX, 1), 100);
        for total in 1..60 {
            for completed in 0..=total {
                let value = score(total, completed, 1);
                assert!((0..=100).contains(&value));
            }
        }
    }
}
