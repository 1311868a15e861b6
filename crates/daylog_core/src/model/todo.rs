//! Work items and backlog items.
//!
//! # Invariants
//! - Titles are trimmed and non-empty.
//! - Minute values are non-negative and at most one day.

use crate::model::date_key::DateKey;
use crate::model::day::{DailyLogId, HourBlockId, UserId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TodoId = Uuid;
pub type BacklogItemId = Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_MINUTES: i64 = 24 * 60;

/// Completion state of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    Done,
}

impl TodoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Done,
            Self::Done => Self::Pending,
        }
    }
}

/// One work item inside an hour slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub daily_log_id: DailyLogId,
    pub hour_block_id: HourBlockId,
    pub title: String,
    pub estimated_minutes: i64,
    pub actual_minutes: Option<i64>,
    pub status: TodoStatus,
    /// Dense zero-based position inside the owning hour block.
    pub sort_order: i64,
    /// Epoch ms; tie-breaker for equal sort orders.
    pub created_at: i64,
}

impl Todo {
    pub fn is_done(&self) -> bool {
        self.status == TodoStatus::Done
    }
}

/// Unfinished work detached from any day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogItem {
    pub id: BacklogItemId,
    pub user_id: UserId,
    pub title: String,
    pub estimated_minutes: i64,
    pub actual_minutes: Option<i64>,
    /// Day the item was deferred from, when it came from a sweep.
    pub source_date: Option<DateKey>,
    pub source_hour: Option<u8>,
    pub created_at: i64,
}

/// Validation failures for todo input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    EmptyTitle,
    TitleTooLong { max_chars: usize, actual_chars: usize },
    MinutesOutOfRange(i64),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "todo title must not be blank"),
            Self::TitleTooLong {
                max_chars,
                actual_chars,
            } => write!(f, "todo title has {actual_chars} chars; limit is {max_chars}"),
            Self::MinutesOutOfRange(value) => {
                write!(f, "minutes {value} is outside 0..={MAX_MINUTES}")
            }
        }
    }
}

impl Error for TodoValidationError {}

/// Trims and bounds a todo title.
pub fn normalize_title(value: &str) -> Result<String, TodoValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }
    let actual_chars = trimmed.chars().count();
    if actual_chars > MAX_TITLE_CHARS {
        return Err(TodoValidationError::TitleTooLong {
            max_chars: MAX_TITLE_CHARS,
            actual_chars,
        });
    }
    Ok(trimmed.to_string())
}

pub fn validate_minutes(value: i64) -> Result<i64, TodoValidationError> {
    if (0..=MAX_MINUTES).contains(&value) {
        Ok(value)
    } else {
        Err(TodoValidationError::MinutesOutOfRange(value))
    }
}
