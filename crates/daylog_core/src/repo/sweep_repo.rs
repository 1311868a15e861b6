//! Day closure (sweep) persistence.
//!
//! # Responsibility
//! - Find open days strictly before a user's "today".
//! - Close one day atomically: freeze score and summary, migrate pending
//!   todos into the backlog, lock the day and stamp `swept_at`.
//!
//! # Invariants
//! - All reads and writes of one sweep share one `IMMEDIATE` transaction;
//!   any failure rolls back to the open state.
//! - A missing or already swept day yields `None` and writes nothing.
//! - Existing `score`/`summary` values are kept (only-if-null freezing).

use crate::db::NOW_MS_SQL;
use crate::model::date_key::DateKey;
use crate::model::day::{DailyLogId, UserId};
use crate::model::summary::{build_summary, SummaryInput};
use crate::model::todo::BacklogItemId;
use crate::repo::day_repo::{load_day_view_in, load_log_in, load_log_by_id_in};
use crate::repo::{ensure_connection_ready, parse_date, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

/// What one successful sweep changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub day_id: DailyLogId,
    pub date: DateKey,
    /// Score stored on the day after the sweep.
    pub score: i64,
    /// Summary stored on the day after the sweep.
    pub summary: String,
    /// Backlog rows created from pending todos, in display order.
    pub backlog_item_ids: Vec<BacklogItemId>,
    pub swept_at: i64,
}

impl SweepReport {
    pub fn deferred_count(&self) -> usize {
        self.backlog_item_ids.len()
    }
}

/// Repository interface for day closure.
pub trait SweepRepository {
    /// Lists open days with `date < today`, ascending.
    fn list_unswept_before(&self, user_id: UserId, today: DateKey) -> RepoResult<Vec<DateKey>>;
    /// Closes one day; `None` when the day is missing or already swept.
    fn sweep_day(
        &self,
        user_id: UserId,
        date: DateKey,
        swept_at: i64,
    ) -> RepoResult<Option<SweepReport>>;
}

/// SQLite-backed sweep repository.
pub struct SqliteSweepRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSweepRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &["daily_logs", "hour_blocks", "todos", "backlog_items"],
        )?;
        Ok(Self { conn })
    }
}

impl SweepRepository for SqliteSweepRepository<'_> {
    fn list_unswept_before(&self, user_id: UserId, today: DateKey) -> RepoResult<Vec<DateKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT date
             FROM daily_logs
             WHERE user_id = ?1
               AND swept_at IS NULL
               AND date < ?2
             ORDER BY date ASC;",
        )?;
        let mut rows = stmt.query(params![user_id.to_string(), today.to_string()])?;
        let mut dates = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            dates.push(parse_date(&text, "daily_logs.date")?);
        }
        Ok(dates)
    }

    fn sweep_day(
        &self,
        user_id: UserId,
        date: DateKey,
        swept_at: i64,
    ) -> RepoResult<Option<SweepReport>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let report = sweep_in(&tx, user_id, date, swept_at)?;
        tx.commit()?;
        Ok(report)
    }
}

fn sweep_in(
    conn: &Connection,
    user_id: UserId,
    date: DateKey,
    swept_at: i64,
) -> RepoResult<Option<SweepReport>> {
    let Some(log) = load_log_in(conn, user_id, date)? else {
        return Ok(None);
    };
    if log.is_swept() {
        return Ok(None);
    }

    let view = load_day_view_in(conn, log)?;
    let counters = view.score_input();
    let day_score = view.log.score.unwrap_or_else(|| counters.score());
    let pending: Vec<_> = view
        .blocks
        .iter()
        .flat_map(|block| {
            block
                .todos
                .iter()
                .filter(|todo| !todo.is_done())
                .map(move |todo| (block.block.hour, todo))
        })
        .collect();
    let computed_summary = build_summary(&SummaryInput {
        date,
        blocks: &view.blocks,
        counters,
        score: day_score,
        deferred_count: pending.len(),
    });

    let mut backlog_item_ids = Vec::with_capacity(pending.len());
    {
        let mut insert = conn.prepare(
            "INSERT INTO backlog_items (
                id,
                user_id,
                title,
                estimated_minutes,
                actual_minutes,
                source_date,
                source_hour
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        )?;
        let mut delete = conn.prepare("DELETE FROM todos WHERE id = ?1;")?;
        for (hour, todo) in &pending {
            let item_id = Uuid::new_v4();
            insert.execute(params![
                item_id.to_string(),
                user_id.to_string(),
                todo.title,
                todo.estimated_minutes,
                todo.actual_minutes,
                date.to_string(),
                i64::from(*hour),
            ])?;
            delete.execute([todo.id.to_string()])?;
            backlog_item_ids.push(item_id);
        }
    }

    conn.execute(
        &format!(
            "UPDATE daily_logs
             SET status = 'history',
                 is_locked = 1,
                 swept_at = ?2,
                 score = COALESCE(score, ?3),
                 summary = COALESCE(summary, ?4),
                 updated_at = {NOW_MS_SQL}
             WHERE id = ?1
               AND swept_at IS NULL;"
        ),
        params![
            view.log.id.to_string(),
            swept_at,
            day_score,
            computed_summary
        ],
    )?;

    let closed = load_log_by_id_in(conn, view.log.id)?;
    Ok(Some(SweepReport {
        day_id: closed.id,
        date,
        score: closed.score.unwrap_or(day_score),
        summary: closed.summary.unwrap_or(computed_summary),
        backlog_item_ids,
        swept_at,
    }))
}
