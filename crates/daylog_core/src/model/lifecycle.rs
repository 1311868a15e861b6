//! Day lifecycle classification.
//!
//! # Invariants
//! - `classify` is total and depends only on its two inputs.
//! - A swept day stays `History` no matter what `today` is.

use crate::model::date_key::DateKey;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Lifecycle status of one day relative to the caller-local "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Date is after today.
    Planning,
    /// Date is today.
    Execution,
    /// Date is before today.
    History,
}

impl DayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Execution => "execution",
            Self::History => "history",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "planning" => Some(Self::Planning),
            "execution" => Some(Self::Execution),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

/// Maps a date to its lifecycle status for the given `today`.
pub fn classify(date: DateKey, today: DateKey) -> DayStatus {
    match date.cmp(&today) {
        Ordering::Less => DayStatus::History,
        Ordering::Equal => DayStatus::Execution,
        Ordering::Greater => DayStatus::Planning,
    }
}

/// Returns the status a stored day should carry after a read at `today`.
///
/// Returns `None` when the stored value is already correct, so callers only
/// write when something changed.
pub fn reconcile_status(
    stored: DayStatus,
    date: DateKey,
    today: DateKey,
    swept: bool,
) -> Option<DayStatus> {
    let expected = if swept {
        DayStatus::History
    } else {
        classify(date, today)
    };
    (expected != stored).then_some(expected)
}
