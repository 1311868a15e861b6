//! Backlog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read and discard user-scoped backlog items.
//! - Restore an item into a day slot through the same materialize and
//!   ordering path as regular todo creation.
//!
//! # Invariants
//! - Restore creates exactly one todo and deletes exactly one backlog item,
//!   in one transaction.
//! - Items are only visible to their owning user.

use crate::model::date_key::DateKey;
use crate::model::day::UserId;
use crate::model::policy::{check_edit, EditRule};
use crate::model::todo::{BacklogItem, BacklogItemId, Todo};
use crate::repo::day_repo::{load_block_in, materialize_in};
use crate::repo::todo_repo::{insert_todo_in, load_required_todo, NewTodo};
use crate::repo::{
    ensure_connection_ready, parse_date, parse_hour, parse_uuid, Entity, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const BACKLOG_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    estimated_minutes,
    actual_minutes,
    source_date,
    source_hour,
    created_at
FROM backlog_items";

/// Repository interface for backlog items.
pub trait BacklogRepository {
    /// Lists the user's items, newest first.
    fn list_items(&self, user_id: UserId) -> RepoResult<Vec<BacklogItem>>;
    fn get_item(&self, user_id: UserId, item_id: BacklogItemId) -> RepoResult<Option<BacklogItem>>;
    /// Moves one item into slot `hour` of `date` as a pending todo.
    fn restore_item(
        &self,
        user_id: UserId,
        item_id: BacklogItemId,
        date: DateKey,
        hour: u8,
        today: DateKey,
    ) -> RepoResult<Todo>;
    /// Deletes one item without restoring it.
    fn discard_item(&self, user_id: UserId, item_id: BacklogItemId) -> RepoResult<()>;
}

/// SQLite-backed backlog repository.
pub struct SqliteBacklogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBacklogRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["backlog_items", "daily_logs", "todos"])?;
        Ok(Self { conn })
    }
}

impl BacklogRepository for SqliteBacklogRepository<'_> {
    fn list_items(&self, user_id: UserId) -> RepoResult<Vec<BacklogItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BACKLOG_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([user_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_backlog_row(row)?);
        }
        Ok(items)
    }

    fn get_item(&self, user_id: UserId, item_id: BacklogItemId) -> RepoResult<Option<BacklogItem>> {
        load_item_in(self.conn, user_id, item_id)
    }

    fn restore_item(
        &self,
        user_id: UserId,
        item_id: BacklogItemId,
        date: DateKey,
        hour: u8,
        today: DateKey,
    ) -> RepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let item = load_item_in(&tx, user_id, item_id)?
            .ok_or_else(|| RepoError::not_found(Entity::BacklogItem, item_id))?;

        let log = materialize_in(&tx, user_id, date, today)?.log;
        check_edit(&log, EditRule::Todo, today)?;
        let block = load_block_in(&tx, log.id, hour)?;

        let todo_id = insert_todo_in(
            &tx,
            &log,
            block.id,
            &NewTodo {
                title: item.title,
                estimated_minutes: item.estimated_minutes,
                actual_minutes: item.actual_minutes,
            },
            None,
        )?;
        let deleted = tx.execute(
            "DELETE FROM backlog_items WHERE id = ?1 AND user_id = ?2;",
            params![item_id.to_string(), user_id.to_string()],
        )?;
        if deleted != 1 {
            return Err(RepoError::Conflict(format!(
                "backlog item {item_id} was consumed concurrently"
            )));
        }

        let todo = load_required_todo(&tx, user_id, todo_id)?;
        tx.commit()?;
        Ok(todo)
    }

    fn discard_item(&self, user_id: UserId, item_id: BacklogItemId) -> RepoResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM backlog_items WHERE id = ?1 AND user_id = ?2;",
            params![item_id.to_string(), user_id.to_string()],
        )?;
        if deleted == 0 {
            return Err(RepoError::not_found(Entity::BacklogItem, item_id));
        }
        Ok(())
    }
}

fn load_item_in(
    conn: &Connection,
    user_id: UserId,
    item_id: BacklogItemId,
) -> RepoResult<Option<BacklogItem>> {
    let mut stmt = conn.prepare(&format!(
        "{BACKLOG_SELECT_SQL}
         WHERE id = ?1
           AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![item_id.to_string(), user_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_backlog_row(row)?));
    }
    Ok(None)
}

fn parse_backlog_row(row: &Row<'_>) -> RepoResult<BacklogItem> {
    let id_text: String = row.get("id")?;
    let user_text: String = row.get("user_id")?;
    let source_date: Option<String> = row.get("source_date")?;
    let source_hour: Option<i64> = row.get("source_hour")?;

    Ok(BacklogItem {
        id: parse_uuid(&id_text, "backlog_items.id")?,
        user_id: parse_uuid(&user_text, "backlog_items.user_id")?,
        title: row.get("title")?,
        estimated_minutes: row.get("estimated_minutes")?,
        actual_minutes: row.get("actual_minutes")?,
        source_date: source_date
            .map(|value| parse_date(&value, "backlog_items.source_date"))
            .transpose()?,
        source_hour: source_hour
            .map(|value| parse_hour(value, "backlog_items.source_hour"))
            .transpose()?,
        created_at: row.get("created_at")?,
    })
}
