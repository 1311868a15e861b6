//! Day materialization and slot editing: contracts and SQLite implementation.
//!
//! # Responsibility
//! - Idempotently ensure one day row and its 24 hour blocks exist.
//! - Reconcile stored lifecycle status against the caller's "today".
//! - Apply gated slot text, lock and score edits.
//!
//! # Invariants
//! - Exactly one `daily_logs` row per `(user_id, date)`.
//! - After `ensure_day` returns, the day has all hours `0..=23`; backfill
//!   only ever inserts.
//! - Re-materializing never touches `is_locked`, `score` or text fields.
//! - Swept days are never reclassified away from `history`.

use crate::db::NOW_MS_SQL;
use crate::model::date_key::DateKey;
use crate::model::day::{
    validate_slot_text, DailyLog, DailyLogId, DayView, HourBlock, HourBlockView, UserId,
    HOURS_PER_DAY,
};
use crate::model::lifecycle::{classify, reconcile_status, DayStatus};
use crate::model::policy::{check_edit, EditDenied, EditRule};
use crate::repo::todo_repo::{parse_todo_row, TODO_SELECT_SQL};
use crate::repo::user_repo::ensure_user_exists;
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_date, parse_hour, parse_uuid, Entity,
    RepoError, RepoResult,
};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

pub(crate) const DAILY_LOG_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    date,
    status,
    is_locked,
    score,
    summary,
    ai_summary,
    ai_model,
    swept_at
FROM daily_logs";

/// Which free-text field of a slot an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotText {
    Plan,
    Reflection,
}

impl SlotText {
    fn column(self) -> &'static str {
        match self {
            Self::Plan => "planned_text",
            Self::Reflection => "reflection_text",
        }
    }

    fn rule(self) -> EditRule {
        match self {
            Self::Plan => EditRule::Plan,
            Self::Reflection => EditRule::Reflection,
        }
    }
}

/// Outcome of one materialization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    /// Day row after status reconciliation.
    pub log: DailyLog,
    /// Whether this call inserted the day row.
    pub created: bool,
    /// Hours inserted to repair an existing day with missing slots.
    pub backfilled_hours: usize,
}

/// Repository interface for day materialization and day-level edits.
pub trait DayRepository {
    /// Ensures the day and all 24 hour blocks exist; reconciles status.
    fn ensure_day(&self, user_id: UserId, date: DateKey, today: DateKey)
        -> RepoResult<Materialized>;
    /// Loads one day row without materializing it.
    fn get_day(&self, user_id: UserId, date: DateKey) -> RepoResult<Option<DailyLog>>;
    /// Loads one day with blocks and ordered todos, without materializing it.
    fn load_day_view(&self, user_id: UserId, date: DateKey) -> RepoResult<Option<DayView>>;
    /// Lists existing days in `start..=end`, ascending by date.
    fn list_days(&self, user_id: UserId, start: DateKey, end: DateKey)
        -> RepoResult<Vec<DailyLog>>;
    /// Replaces plan or reflection text of one slot, subject to edit gates.
    fn update_slot_text(
        &self,
        user_id: UserId,
        date: DateKey,
        hour: u8,
        field: SlotText,
        text: &str,
        today: DateKey,
    ) -> RepoResult<HourBlock>;
    /// Sets the manual lock flag. Swept days cannot be unlocked.
    fn set_locked(
        &self,
        user_id: UserId,
        date: DateKey,
        locked: bool,
        today: DateKey,
    ) -> RepoResult<DailyLog>;
    /// Sets a manual score on a day that has not been swept.
    fn set_score(
        &self,
        user_id: UserId,
        date: DateKey,
        score: i64,
        today: DateKey,
    ) -> RepoResult<DailyLog>;
    /// Persists the deterministic summary of an unswept day.
    fn save_summary(&self, day_id: DailyLogId, summary: &str) -> RepoResult<()>;
    /// Persists enrichment output.
    fn save_ai_summary(&self, day_id: DailyLogId, text: &str, model: &str) -> RepoResult<()>;
}

/// SQLite-backed day repository.
pub struct SqliteDayRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDayRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users", "daily_logs", "hour_blocks", "todos"])?;
        Ok(Self { conn })
    }
}

impl DayRepository for SqliteDayRepository<'_> {
    fn ensure_day(
        &self,
        user_id: UserId,
        date: DateKey,
        today: DateKey,
    ) -> RepoResult<Materialized> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let materialized = materialize_in(&tx, user_id, date, today)?;
        tx.commit()?;
        Ok(materialized)
    }

    fn get_day(&self, user_id: UserId, date: DateKey) -> RepoResult<Option<DailyLog>> {
        load_log_in(self.conn, user_id, date)
    }

    fn load_day_view(&self, user_id: UserId, date: DateKey) -> RepoResult<Option<DayView>> {
        match load_log_in(self.conn, user_id, date)? {
            Some(log) => Ok(Some(load_day_view_in(self.conn, log)?)),
            None => Ok(None),
        }
    }

    fn list_days(
        &self,
        user_id: UserId,
        start: DateKey,
        end: DateKey,
    ) -> RepoResult<Vec<DailyLog>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DAILY_LOG_SELECT_SQL}
             WHERE user_id = ?1
               AND date >= ?2
               AND date <= ?3
             ORDER BY date ASC;"
        ))?;
        let mut rows = stmt.query(params![
            user_id.to_string(),
            start.to_string(),
            end.to_string()
        ])?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next()? {
            logs.push(parse_daily_log_row(row)?);
        }
        Ok(logs)
    }

    fn update_slot_text(
        &self,
        user_id: UserId,
        date: DateKey,
        hour: u8,
        field: SlotText,
        text: &str,
        today: DateKey,
    ) -> RepoResult<HourBlock> {
        validate_slot_text(text)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let materialized = materialize_in(&tx, user_id, date, today)?;
        check_edit(&materialized.log, field.rule(), today)?;

        let changed = tx.execute(
            &format!(
                "UPDATE hour_blocks
                 SET {column} = ?3,
                     updated_at = {NOW_MS_SQL}
                 WHERE daily_log_id = ?1
                   AND hour = ?2;",
                column = field.column()
            ),
            params![materialized.log.id.to_string(), i64::from(hour), text],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(
                Entity::HourBlock,
                format!("{date} {hour:02}:00"),
            ));
        }

        let block = load_block_in(&tx, materialized.log.id, hour)?;
        tx.commit()?;
        Ok(block)
    }

    fn set_locked(
        &self,
        user_id: UserId,
        date: DateKey,
        locked: bool,
        today: DateKey,
    ) -> RepoResult<DailyLog> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let log = materialize_in(&tx, user_id, date, today)?.log;
        if log.is_swept() && !locked {
            return Err(EditDenied::Swept(date).into());
        }

        tx.execute(
            &format!(
                "UPDATE daily_logs
                 SET is_locked = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![log.id.to_string(), bool_to_int(locked)],
        )?;
        let updated = load_log_by_id_in(&tx, log.id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn set_score(
        &self,
        user_id: UserId,
        date: DateKey,
        score: i64,
        today: DateKey,
    ) -> RepoResult<DailyLog> {
        if !(0..=100).contains(&score) {
            return Err(RepoError::Validation(format!(
                "score {score} is outside 0..=100"
            )));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let log = materialize_in(&tx, user_id, date, today)?.log;
        if log.is_swept() {
            return Err(EditDenied::Swept(date).into());
        }

        tx.execute(
            &format!(
                "UPDATE daily_logs
                 SET score = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND swept_at IS NULL;"
            ),
            params![log.id.to_string(), score],
        )?;
        let updated = load_log_by_id_in(&tx, log.id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn save_summary(&self, day_id: DailyLogId, summary: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE daily_logs
                 SET summary = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1
                   AND swept_at IS NULL;"
            ),
            params![day_id.to_string(), summary],
        )?;
        if changed == 0 {
            ensure_day_id_exists(self.conn, day_id)?;
        }
        Ok(())
    }

    fn save_ai_summary(&self, day_id: DailyLogId, text: &str, model: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE daily_logs
                 SET ai_summary = ?2,
                     ai_model = ?3,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![day_id.to_string(), text, model],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(Entity::DailyLog, day_id));
        }
        Ok(())
    }
}

/// Materializes one day inside the caller's transaction.
///
/// Three steps: guarded insert of the day row, status reconciliation for a
/// pre-existing row, and a duplicate-tolerant backfill of missing hours.
pub(crate) fn materialize_in(
    conn: &Connection,
    user_id: UserId,
    date: DateKey,
    today: DateKey,
) -> RepoResult<Materialized> {
    ensure_user_exists(conn, user_id)?;

    let status = classify(date, today);
    let candidate_id = Uuid::new_v4();
    let inserted = conn.execute(
        "INSERT INTO daily_logs (id, user_id, date, status, is_locked)
         VALUES (?1, ?2, ?3, ?4, 0)
         ON CONFLICT (user_id, date) DO NOTHING;",
        params![
            candidate_id.to_string(),
            user_id.to_string(),
            date.to_string(),
            status.as_str(),
        ],
    )?;
    let created = inserted == 1;

    let mut log = load_log_in(conn, user_id, date)?
        .ok_or_else(|| RepoError::not_found(Entity::DailyLog, date))?;

    if !created {
        if let Some(corrected) = reconcile_status(log.status, log.date, today, log.is_swept()) {
            write_status_in(conn, log.id, corrected)?;
            debug!(
                "event=day_reconcile module=repo status=ok from={} to={}",
                log.status.as_str(),
                corrected.as_str()
            );
            log.status = corrected;
        }
    }

    let backfilled_hours = backfill_hours_in(conn, log.id)?;
    if !created && backfilled_hours > 0 {
        warn!(
            "event=day_backfill module=repo status=repaired date={} inserted_hours={}",
            date, backfilled_hours
        );
    }

    Ok(Materialized {
        log,
        created,
        backfilled_hours,
    })
}

/// Inserts every missing hour block; returns how many were inserted.
pub(crate) fn backfill_hours_in(conn: &Connection, day_id: DailyLogId) -> RepoResult<usize> {
    let mut present = BTreeSet::new();
    {
        let mut stmt = conn.prepare("SELECT hour FROM hour_blocks WHERE daily_log_id = ?1;")?;
        let mut rows = stmt.query([day_id.to_string()])?;
        while let Some(row) = rows.next()? {
            present.insert(parse_hour(row.get(0)?, "hour_blocks.hour")?);
        }
    }
    if present.len() == usize::from(HOURS_PER_DAY) {
        return Ok(0);
    }

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO hour_blocks (id, daily_log_id, hour)
         VALUES (?1, ?2, ?3);",
    )?;
    let mut inserted = 0;
    for hour in (0..HOURS_PER_DAY).filter(|hour| !present.contains(hour)) {
        inserted += stmt.execute(params![
            Uuid::new_v4().to_string(),
            day_id.to_string(),
            i64::from(hour)
        ])?;
    }
    Ok(inserted)
}

fn write_status_in(conn: &Connection, day_id: DailyLogId, status: DayStatus) -> RepoResult<()> {
    conn.execute(
        &format!(
            "UPDATE daily_logs
             SET status = ?2,
                 updated_at = {NOW_MS_SQL}
             WHERE id = ?1
               AND (swept_at IS NULL OR ?2 = 'history');"
        ),
        params![day_id.to_string(), status.as_str()],
    )?;
    Ok(())
}

pub(crate) fn load_log_in(
    conn: &Connection,
    user_id: UserId,
    date: DateKey,
) -> RepoResult<Option<DailyLog>> {
    let mut stmt = conn.prepare(&format!(
        "{DAILY_LOG_SELECT_SQL}
         WHERE user_id = ?1
           AND date = ?2;"
    ))?;
    let mut rows = stmt.query(params![user_id.to_string(), date.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_daily_log_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_log_by_id_in(conn: &Connection, day_id: DailyLogId) -> RepoResult<DailyLog> {
    let mut stmt = conn.prepare(&format!(
        "{DAILY_LOG_SELECT_SQL}
         WHERE id = ?1;"
    ))?;
    let mut rows = stmt.query([day_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_daily_log_row(row);
    }
    Err(RepoError::not_found(Entity::DailyLog, day_id))
}

/// Assembles the full view: 24 blocks ascending, todos in display order.
pub(crate) fn load_day_view_in(conn: &Connection, log: DailyLog) -> RepoResult<DayView> {
    let mut blocks: Vec<HourBlockView> = load_blocks_in(conn, log.id)?
        .into_iter()
        .map(|block| HourBlockView {
            block,
            todos: Vec::new(),
        })
        .collect();
    let index: HashMap<Uuid, usize> = blocks
        .iter()
        .enumerate()
        .map(|(position, view)| (view.block.id, position))
        .collect();

    let mut stmt = conn.prepare(&format!(
        "{TODO_SELECT_SQL}
         INNER JOIN hour_blocks b ON b.id = t.hour_block_id
         WHERE t.daily_log_id = ?1
         ORDER BY b.hour ASC, t.sort_order ASC, t.created_at ASC, t.rowid ASC;"
    ))?;
    let mut rows = stmt.query([log.id.to_string()])?;
    while let Some(row) = rows.next()? {
        let todo = parse_todo_row(row)?;
        let position = index.get(&todo.hour_block_id).copied().ok_or_else(|| {
            RepoError::InvalidData(format!(
                "todo {} references hour block outside its day",
                todo.id
            ))
        })?;
        blocks[position].todos.push(todo);
    }

    Ok(DayView { log, blocks })
}

fn load_blocks_in(conn: &Connection, day_id: DailyLogId) -> RepoResult<Vec<HourBlock>> {
    let mut stmt = conn.prepare(
        "SELECT id, daily_log_id, hour, planned_text, reflection_text
         FROM hour_blocks
         WHERE daily_log_id = ?1
         ORDER BY hour ASC;",
    )?;
    let mut rows = stmt.query([day_id.to_string()])?;
    let mut blocks = Vec::new();
    while let Some(row) = rows.next()? {
        blocks.push(parse_hour_block_row(row)?);
    }
    Ok(blocks)
}

pub(crate) fn load_block_in(
    conn: &Connection,
    day_id: DailyLogId,
    hour: u8,
) -> RepoResult<HourBlock> {
    let mut stmt = conn.prepare(
        "SELECT id, daily_log_id, hour, planned_text, reflection_text
         FROM hour_blocks
         WHERE daily_log_id = ?1
           AND hour = ?2;",
    )?;
    let mut rows = stmt.query(params![day_id.to_string(), i64::from(hour)])?;
    if let Some(row) = rows.next()? {
        return parse_hour_block_row(row);
    }
    Err(RepoError::not_found(
        Entity::HourBlock,
        format!("{day_id} {hour:02}:00"),
    ))
}

fn ensure_day_id_exists(conn: &Connection, day_id: DailyLogId) -> RepoResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM daily_logs WHERE id = ?1;",
            [day_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    found
        .map(|_| ())
        .ok_or_else(|| RepoError::not_found(Entity::DailyLog, day_id))
}

pub(crate) fn parse_daily_log_row(row: &Row<'_>) -> RepoResult<DailyLog> {
    let id_text: String = row.get("id")?;
    let user_text: String = row.get("user_id")?;
    let date_text: String = row.get("date")?;
    let status_text: String = row.get("status")?;
    let status = DayStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid day status `{status_text}` in daily_logs.status"
        ))
    })?;

    let log = DailyLog {
        id: parse_uuid(&id_text, "daily_logs.id")?,
        user_id: parse_uuid(&user_text, "daily_logs.user_id")?,
        date: parse_date(&date_text, "daily_logs.date")?,
        status,
        is_locked: parse_bool(row.get("is_locked")?, "daily_logs.is_locked")?,
        score: row.get("score")?,
        summary: row.get("summary")?,
        ai_summary: row.get("ai_summary")?,
        ai_model: row.get("ai_model")?,
        swept_at: row.get("swept_at")?,
    };
    log.validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    Ok(log)
}

fn parse_hour_block_row(row: &Row<'_>) -> RepoResult<HourBlock> {
    let id_text: String = row.get("id")?;
    let day_text: String = row.get("daily_log_id")?;
    Ok(HourBlock {
        id: parse_uuid(&id_text, "hour_blocks.id")?,
        daily_log_id: parse_uuid(&day_text, "hour_blocks.daily_log_id")?,
        hour: parse_hour(row.get("hour")?, "hour_blocks.hour")?,
        planned_text: row.get("planned_text")?,
        reflection_text: row.get("reflection_text")?,
    })
}
