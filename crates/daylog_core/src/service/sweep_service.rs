//! Day closure use-cases.
//!
//! # Responsibility
//! - Close one past day, or every open day before "today".
//!
//! # Invariants
//! - Each date is swept in its own transaction; one failing date never
//!   stops the remaining dates.
//! - Sweeping an already swept day is a no-op reported as `None`.
//! - The sweep timestamp comes from the caller-supplied instant.

use crate::model::date_key::DateKey;
use crate::model::day::UserId;
use crate::repo::sweep_repo::{SweepReport, SweepRepository};
use crate::service::{parse_date_input, retry_on_conflict, ServiceResult};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;

/// Counters from one sweep-all pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepAllReport {
    /// Open past days found when the pass started.
    pub attempted: usize,
    pub swept: usize,
    /// Days closed concurrently by another caller.
    pub skipped: usize,
    pub failed: usize,
}

/// Sweep service facade over repository implementations.
pub struct SweepService<R: SweepRepository> {
    repo: R,
}

impl<R: SweepRepository> SweepService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Closes one day. Returns `None` if the day is missing or already swept.
    pub fn sweep_one(
        &self,
        user_id: UserId,
        date: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<SweepReport>> {
        let date = parse_date_input(date)?;
        self.sweep_date(user_id, date, now)
    }

    /// Closes every open day strictly before `today`, oldest first.
    pub fn sweep_all_past_unswept(
        &self,
        user_id: UserId,
        today: DateKey,
        now: DateTime<Utc>,
    ) -> ServiceResult<SweepAllReport> {
        let dates = self.repo.list_unswept_before(user_id, today)?;
        let mut report = SweepAllReport {
            attempted: dates.len(),
            ..SweepAllReport::default()
        };

        for date in dates {
            match self.sweep_date(user_id, date, now) {
                Ok(Some(_)) => report.swept += 1,
                Ok(None) => report.skipped += 1,
                Err(err) => {
                    report.failed += 1;
                    error!(
                        "event=sweep_day module=sweep status=error date={} error={}",
                        date, err
                    );
                }
            }
        }

        info!(
            "event=sweep_all module=sweep status=ok today={} attempted={} swept={} skipped={} failed={}",
            today, report.attempted, report.swept, report.skipped, report.failed
        );
        Ok(report)
    }

    fn sweep_date(
        &self,
        user_id: UserId,
        date: DateKey,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<SweepReport>> {
        let swept_at = now.timestamp_millis();
        let outcome = retry_on_conflict("sweep_day", || {
            self.repo.sweep_day(user_id, date, swept_at)
        })?;
        match &outcome {
            Some(report) => info!(
                "event=sweep_day module=sweep status=ok date={} deferred={} score={}",
                date,
                report.deferred_count(),
                report.score
            ),
            None => info!(
                "event=sweep_day module=sweep status=skipped date={}",
                date
            ),
        }
        Ok(outcome)
    }
}
