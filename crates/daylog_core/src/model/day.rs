//! Day and hour-slot records.
//!
//! # Responsibility
//! - Define the stored shape of a daily log and its 24 hour blocks.
//! - Define the assembled read model handed to callers.
//!
//! # Invariants
//! - `swept_at.is_some()` implies `is_locked && status == History`.
//! - Hours are in `0..=23` and unique per day.

use crate::model::date_key::DateKey;
use crate::model::lifecycle::DayStatus;
use crate::model::score::ScoreInput;
use crate::model::todo::Todo;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type UserId = Uuid;
pub type DailyLogId = Uuid;
pub type HourBlockId = Uuid;

/// Number of fixed hour slots per day.
pub const HOURS_PER_DAY: u8 = 24;
/// Upper bound for planned/reflection text, in characters.
pub const MAX_SLOT_TEXT_CHARS: usize = 2000;

/// One user with the zone used to derive their "today".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// IANA zone name, validated on write.
    pub timezone: String,
}

/// Stored day row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    pub id: DailyLogId,
    pub user_id: UserId,
    pub date: DateKey,
    pub status: DayStatus,
    pub is_locked: bool,
    /// Frozen 0..=100 score, set at sweep or manually.
    pub score: Option<i64>,
    /// Deterministic summary text.
    pub summary: Option<String>,
    /// Enrichment text; stale values are kept when enrichment fails.
    pub ai_summary: Option<String>,
    pub ai_model: Option<String>,
    /// Epoch ms of the sweep that closed this day.
    pub swept_at: Option<i64>,
}

impl DailyLog {
    pub fn is_swept(&self) -> bool {
        self.swept_at.is_some()
    }

    /// Checks the swept-implies-locked-history invariant.
    pub fn validate(&self) -> Result<(), DayValidationError> {
        if self.is_swept() && (!self.is_locked || self.status != DayStatus::History) {
            return Err(DayValidationError::SweptDayNotClosed(self.id));
        }
        if let Some(score) = self.score {
            if !(0..=100).contains(&score) {
                return Err(DayValidationError::ScoreOutOfRange(score));
            }
        }
        Ok(())
    }
}

/// Stored hour slot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBlock {
    pub id: HourBlockId,
    pub daily_log_id: DailyLogId,
    pub hour: u8,
    pub planned_text: String,
    pub reflection_text: String,
}

/// One hour slot with its ordered todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBlockView {
    pub block: HourBlock,
    /// Display order: `sort_order ASC, created_at ASC`.
    pub todos: Vec<Todo>,
}

/// A day with all 24 slots, ready to render or sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayView {
    pub log: DailyLog,
    /// Ascending by hour.
    pub blocks: Vec<HourBlockView>,
}

impl DayView {
    /// Iterates every todo in display order.
    pub fn todos(&self) -> impl Iterator<Item = &Todo> {
        self.blocks.iter().flat_map(|view| view.todos.iter())
    }

    pub fn block_for_hour(&self, hour: u8) -> Option<&HourBlockView> {
        self.blocks.iter().find(|view| view.block.hour == hour)
    }

    /// Completion counters over every todo of the day.
    pub fn score_input(&self) -> ScoreInput {
        self.todos().fold(ScoreInput::default(), |mut acc, todo| {
            acc.total_estimated_minutes += todo.estimated_minutes;
            if todo.is_done() {
                acc.completed_estimated_minutes += todo.estimated_minutes;
                acc.completed_count += 1;
            }
            acc
        })
    }

    pub fn pending_count(&self) -> usize {
        self.todos().filter(|todo| !todo.is_done()).count()
    }

    /// Frozen score for swept days, live preview otherwise.
    pub fn effective_score(&self) -> i64 {
        match (self.log.is_swept(), self.log.score) {
            (true, Some(frozen)) => frozen,
            _ => self.score_input().score(),
        }
    }
}

/// Validation failures for day records and slot input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayValidationError {
    SweptDayNotClosed(DailyLogId),
    ScoreOutOfRange(i64),
    HourOutOfRange(i64),
    TextTooLong { max_chars: usize, actual_chars: usize },
}

impl Display for DayValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SweptDayNotClosed(id) => {
                write!(f, "swept day {id} must be locked and in history")
            }
            Self::ScoreOutOfRange(value) => write!(f, "score {value} is outside 0..=100"),
            Self::HourOutOfRange(value) => write!(f, "hour {value} is outside 0..=23"),
            Self::TextTooLong {
                max_chars,
                actual_chars,
            } => write!(f, "text has {actual_chars} chars; limit is {max_chars}"),
        }
    }
}

impl Error for DayValidationError {}

/// Validates an hour index from external input.
pub fn validate_hour(hour: i64) -> Result<u8, DayValidationError> {
    if (0..i64::from(HOURS_PER_DAY)).contains(&hour) {
        Ok(hour as u8)
    } else {
        Err(DayValidationError::HourOutOfRange(hour))
    }
}

/// Validates planned/reflection text length.
pub fn validate_slot_text(text: &str) -> Result<(), DayValidationError> {
    let actual_chars = text.chars().count();
    if actual_chars > MAX_SLOT_TEXT_CHARS {
        return Err(DayValidationError::TextTooLong {
            max_chars: MAX_SLOT_TEXT_CHARS,
            actual_chars,
        });
    }
    Ok(())
}
