//! Edit gates for days, slots and todos.
//!
//! Gates are evaluated inside the same transaction as the mutation they
//! protect, so a concurrent sweep cannot slip between check and write.

use crate::model::date_key::DateKey;
use crate::model::day::DailyLog;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Kind of mutation being attempted on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditRule {
    /// Planned text of a slot.
    Plan,
    /// Reflection text of a slot.
    Reflection,
    /// Create, toggle, delete or move a todo, or restore backlog into the day.
    Todo,
    /// Bulk-complete every pending todo.
    CompleteAll,
}

/// Business-rule refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditDenied {
    Locked(DateKey),
    PastDay(DateKey),
    FutureDay(DateKey),
    NotToday(DateKey),
    /// Swept days cannot be unlocked or rescored.
    Swept(DateKey),
    /// Todo and target slot belong to different days.
    CrossDayMove,
}

impl Display for EditDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked(date) => write!(f, "day {date} is locked"),
            Self::PastDay(date) => write!(f, "day {date} is in the past"),
            Self::FutureDay(date) => write!(f, "day {date} has not started yet"),
            Self::NotToday(date) => write!(f, "day {date} is not today"),
            Self::Swept(date) => write!(f, "day {date} has been swept"),
            Self::CrossDayMove => write!(f, "todos can only move within their own day"),
        }
    }
}

impl Error for EditDenied {}

/// Checks whether `rule` may be applied to `log` given the caller's `today`.
pub fn check_edit(log: &DailyLog, rule: EditRule, today: DateKey) -> Result<(), EditDenied> {
    if log.is_locked {
        return Err(EditDenied::Locked(log.date));
    }
    match rule {
        EditRule::Plan | EditRule::Todo if log.date < today => Err(EditDenied::PastDay(log.date)),
        EditRule::Reflection if log.date > today => Err(EditDenied::FutureDay(log.date)),
        EditRule::CompleteAll if log.date != today => Err(EditDenied::NotToday(log.date)),
        _ => Ok(()),
    }
}
