//! Day-level use-cases: materialize, read, slot edits, lock and score.
//!
//! # Responsibility
//! - Heal missing structure before returning any day to a caller.
//! - Attach a live score preview to unswept days.
//! - Provide a read-only week overview.
//!
//! # Invariants
//! - Reads of one date always return all 24 hour blocks.
//! - `week_overview` never creates rows.

use crate::model::date_key::{list_inclusive, DateKey};
use crate::model::day::{DailyLog, DayView, HourBlock, UserId};
use crate::model::lifecycle::{classify, DayStatus};
use crate::model::score::ScoreInput;
use crate::repo::day_repo::{DayRepository, SlotText};
use crate::repo::{Entity, RepoError};
use crate::service::{parse_date_input, parse_hour_input, retry_on_conflict, ServiceResult};
use log::{debug, info};
use serde::Serialize;

/// Score shown next to a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScorePreview {
    pub score: i64,
    /// `true` once the day is swept and the score can no longer change.
    pub frozen: bool,
    pub counters: ScoreInput,
}

/// One materialized day plus its score preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySnapshot {
    pub view: DayView,
    pub preview: ScorePreview,
}

/// One column of the week overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekDay {
    pub date: DateKey,
    pub status: DayStatus,
    /// Frozen score if swept, preview if the day exists, `None` otherwise.
    pub score: Option<i64>,
    pub swept: bool,
}

/// Day service facade over repository implementations.
pub struct DayService<R: DayRepository> {
    repo: R,
}

impl<R: DayRepository> DayService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Ensures the day and its 24 slots exist; reconciles status.
    pub fn ensure_day(
        &self,
        user_id: UserId,
        date: &str,
        today: DateKey,
    ) -> ServiceResult<DailyLog> {
        let date = parse_date_input(date)?;
        self.materialize(user_id, date, today)
    }

    /// Materializes and returns the full day with a score preview.
    pub fn get_day(
        &self,
        user_id: UserId,
        date: &str,
        today: DateKey,
    ) -> ServiceResult<DaySnapshot> {
        let date = parse_date_input(date)?;
        self.snapshot(user_id, date, today)
    }

    pub fn update_plan(
        &self,
        user_id: UserId,
        date: &str,
        hour: u8,
        text: &str,
        today: DateKey,
    ) -> ServiceResult<HourBlock> {
        self.update_slot(user_id, date, hour, SlotText::Plan, text, today)
    }

    pub fn update_reflection(
        &self,
        user_id: UserId,
        date: &str,
        hour: u8,
        text: &str,
        today: DateKey,
    ) -> ServiceResult<HourBlock> {
        self.update_slot(user_id, date, hour, SlotText::Reflection, text, today)
    }

    /// Manual lock toggle; unlocking a swept day is `Forbidden`.
    pub fn set_locked(
        &self,
        user_id: UserId,
        date: &str,
        locked: bool,
        today: DateKey,
    ) -> ServiceResult<DailyLog> {
        let date = parse_date_input(date)?;
        let log = self.repo.set_locked(user_id, date, locked, today)?;
        info!(
            "event=day_lock module=service status=ok date={} locked={}",
            date, locked
        );
        Ok(log)
    }

    /// Stores a manual score on an unswept day; a later sweep keeps it.
    pub fn set_manual_score(
        &self,
        user_id: UserId,
        date: &str,
        score: i64,
        today: DateKey,
    ) -> ServiceResult<DailyLog> {
        let date = parse_date_input(date)?;
        let log = self.repo.set_score(user_id, date, score, today)?;
        info!(
            "event=day_score module=service status=ok date={} score={}",
            date, score
        );
        Ok(log)
    }

    /// Summarizes the Monday..Sunday week containing `date`, clipped at
    /// `9999-12-31`.
    pub fn week_overview(
        &self,
        user_id: UserId,
        date: &str,
        today: DateKey,
    ) -> ServiceResult<Vec<WeekDay>> {
        let date = parse_date_input(date)?;
        let start = date.iso_week_start();
        let end = date.iso_week_end();
        let stored = self.repo.list_days(user_id, start, end)?;

        let mut week = Vec::with_capacity(7);
        for day in list_inclusive(start, end) {
            let entry = match stored.iter().find(|log| log.date == day) {
                Some(log) if log.is_swept() => WeekDay {
                    date: day,
                    status: DayStatus::History,
                    score: log.score,
                    swept: true,
                },
                Some(_) => {
                    let preview = self
                        .repo
                        .load_day_view(user_id, day)?
                        .map(|view| view.score_input().score());
                    WeekDay {
                        date: day,
                        status: classify(day, today),
                        score: preview,
                        swept: false,
                    }
                }
                None => WeekDay {
                    date: day,
                    status: classify(day, today),
                    score: None,
                    swept: false,
                },
            };
            week.push(entry);
        }
        Ok(week)
    }

    fn update_slot(
        &self,
        user_id: UserId,
        date: &str,
        hour: u8,
        field: SlotText,
        text: &str,
        today: DateKey,
    ) -> ServiceResult<HourBlock> {
        let date = parse_date_input(date)?;
        let hour = parse_hour_input(hour)?;
        let block = self
            .repo
            .update_slot_text(user_id, date, hour, field, text, today)?;
        debug!(
            "event=slot_update module=service status=ok date={} hour={} field={:?} chars={}",
            date,
            hour,
            field,
            text.chars().count()
        );
        Ok(block)
    }

    pub(crate) fn materialize(
        &self,
        user_id: UserId,
        date: DateKey,
        today: DateKey,
    ) -> ServiceResult<DailyLog> {
        let materialized =
            retry_on_conflict("ensure_day", || self.repo.ensure_day(user_id, date, today))?;
        if materialized.created {
            debug!(
                "event=day_materialize module=service status=created date={} day_status={}",
                date,
                materialized.log.status.as_str()
            );
        }
        Ok(materialized.log)
    }

    pub(crate) fn snapshot(
        &self,
        user_id: UserId,
        date: DateKey,
        today: DateKey,
    ) -> ServiceResult<DaySnapshot> {
        self.materialize(user_id, date, today)?;
        let view = self
            .repo
            .load_day_view(user_id, date)?
            .ok_or_else(|| RepoError::not_found(Entity::DailyLog, date))?;
        let counters = view.score_input();
        let preview = ScorePreview {
            score: view.effective_score(),
            frozen: view.log.is_swept(),
            counters,
        };
        Ok(DaySnapshot { view, preview })
    }
}
