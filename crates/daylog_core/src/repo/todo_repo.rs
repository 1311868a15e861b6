//! Todo repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create, update, delete and move todos inside hour blocks.
//! - Keep per-block `sort_order` dense after every structural change.
//!
//! # Invariants
//! - Each structural mutation re-reads the affected containers inside its
//!   own `IMMEDIATE` transaction before computing new orders, so stale
//!   client indices only influence placement.
//! - A move rewrites the moved row, the target order and the source order
//!   in one transaction.
//! - Todos never move across days.

use crate::db::NOW_MS_SQL;
use crate::model::date_key::DateKey;
use crate::model::day::{DailyLog, HourBlockId, UserId};
use crate::model::ordering::{plan_insert, plan_move_across, plan_move_within, plan_remove};
use crate::model::ordering::{Assignment, OrderEntry};
use crate::model::policy::{check_edit, EditDenied, EditRule};
use crate::model::todo::{normalize_title, validate_minutes, Todo, TodoId, TodoStatus};
use crate::repo::day_repo::{load_block_in, load_log_by_id_in, materialize_in};
use crate::repo::{ensure_connection_ready, parse_uuid, Entity, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

pub(crate) const TODO_SELECT_SQL: &str = "SELECT
    t.id AS id,
    t.daily_log_id AS daily_log_id,
    t.hour_block_id AS hour_block_id,
    t.title AS title,
    t.estimated_minutes AS estimated_minutes,
    t.actual_minutes AS actual_minutes,
    t.status AS status,
    t.sort_order AS sort_order,
    t.created_at AS created_at
FROM todos t";

/// Input for creating one todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub estimated_minutes: i64,
    pub actual_minutes: Option<i64>,
}

/// Result of a move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub todo: Todo,
    /// Block the todo left; equal to the target for same-block moves.
    pub source_block_id: HourBlockId,
    /// Index the todo landed at after clamping.
    pub placed_index: usize,
}

/// Repository interface for todo mutations.
pub trait TodoRepository {
    /// Appends a todo to slot `hour` of `date`, materializing the day first.
    fn create_todo(
        &self,
        user_id: UserId,
        date: DateKey,
        hour: u8,
        input: &NewTodo,
        today: DateKey,
    ) -> RepoResult<Todo>;
    /// Loads one todo owned by `user_id`.
    fn get_todo(&self, user_id: UserId, todo_id: TodoId) -> RepoResult<Option<Todo>>;
    /// Lists one block's todos in display order.
    fn list_block(&self, user_id: UserId, block_id: HourBlockId) -> RepoResult<Vec<Todo>>;
    fn set_status(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        status: TodoStatus,
        today: DateKey,
    ) -> RepoResult<Todo>;
    /// Flips Pending and Done against the stored status.
    fn toggle_status(&self, user_id: UserId, todo_id: TodoId, today: DateKey) -> RepoResult<Todo>;
    fn set_actual_minutes(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        minutes: Option<i64>,
        today: DateKey,
    ) -> RepoResult<Todo>;
    /// Deletes a todo and closes the gap in its block.
    fn delete_todo(&self, user_id: UserId, todo_id: TodoId, today: DateKey) -> RepoResult<()>;
    /// Moves a todo to `target_index` of `target_block_id` on the same day.
    fn move_todo(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        target_block_id: HourBlockId,
        target_index: i64,
        today: DateKey,
    ) -> RepoResult<MoveOutcome>;
    /// Marks every pending todo of `date` done; returns how many changed.
    fn complete_all(&self, user_id: UserId, date: DateKey, today: DateKey) -> RepoResult<usize>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["daily_logs", "hour_blocks", "todos"])?;
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn create_todo(
        &self,
        user_id: UserId,
        date: DateKey,
        hour: u8,
        input: &NewTodo,
        today: DateKey,
    ) -> RepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let log = materialize_in(&tx, user_id, date, today)?.log;
        check_edit(&log, EditRule::Todo, today)?;

        let block = load_block_in(&tx, log.id, hour)?;
        let todo_id = insert_todo_in(&tx, &log, block.id, input, None)?;
        let todo = load_required_todo(&tx, user_id, todo_id)?;
        tx.commit()?;
        Ok(todo)
    }

    fn get_todo(&self, user_id: UserId, todo_id: TodoId) -> RepoResult<Option<Todo>> {
        load_todo_in(self.conn, user_id, todo_id)
    }

    fn list_block(&self, user_id: UserId, block_id: HourBlockId) -> RepoResult<Vec<Todo>> {
        ensure_block_owned(self.conn, user_id, block_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "{TODO_SELECT_SQL}
             WHERE t.hour_block_id = ?1
             ORDER BY t.sort_order ASC, t.created_at ASC, t.rowid ASC;"
        ))?;
        let mut rows = stmt.query([block_id.to_string()])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn set_status(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        status: TodoStatus,
        today: DateKey,
    ) -> RepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (todo, log) = load_editable_todo(&tx, user_id, todo_id, today)?;
        tx.execute(
            &format!(
                "UPDATE todos
                 SET status = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![todo.id.to_string(), status.as_str()],
        )?;
        let updated = load_required_todo(&tx, log.user_id, todo.id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn toggle_status(&self, user_id: UserId, todo_id: TodoId, today: DateKey) -> RepoResult<Todo> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (todo, log) = load_editable_todo(&tx, user_id, todo_id, today)?;
        tx.execute(
            &format!(
                "UPDATE todos
                 SET status = CASE status WHEN 'pending' THEN 'done' ELSE 'pending' END,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            [todo.id.to_string()],
        )?;
        let updated = load_required_todo(&tx, log.user_id, todo.id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn set_actual_minutes(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        minutes: Option<i64>,
        today: DateKey,
    ) -> RepoResult<Todo> {
        let minutes = minutes.map(validate_minutes).transpose()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (todo, _) = load_editable_todo(&tx, user_id, todo_id, today)?;
        tx.execute(
            &format!(
                "UPDATE todos
                 SET actual_minutes = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![todo.id.to_string(), minutes],
        )?;
        let updated = load_required_todo(&tx, user_id, todo.id)?;
        tx.commit()?;
        Ok(updated)
    }

    fn delete_todo(&self, user_id: UserId, todo_id: TodoId, today: DateKey) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (todo, _) = load_editable_todo(&tx, user_id, todo_id, today)?;

        let members = load_order_entries(&tx, todo.hour_block_id)?;
        tx.execute("DELETE FROM todos WHERE id = ?1;", [todo.id.to_string()])?;
        write_assignments(&tx, &plan_remove(&members, todo.id))?;

        tx.commit()?;
        Ok(())
    }

    fn move_todo(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        target_block_id: HourBlockId,
        target_index: i64,
        today: DateKey,
    ) -> RepoResult<MoveOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (todo, log) = load_editable_todo(&tx, user_id, todo_id, today)?;

        let target_day = ensure_block_owned(&tx, user_id, target_block_id)?;
        if target_day != log.id {
            return Err(EditDenied::CrossDayMove.into());
        }

        let source_block_id = todo.hour_block_id;
        let plan = if source_block_id == target_block_id {
            plan_move_within(
                &load_order_entries(&tx, source_block_id)?,
                todo.id,
                target_index,
            )
        } else {
            let source = load_order_entries(&tx, source_block_id)?;
            let target = load_order_entries(&tx, target_block_id)?;
            plan_move_across(&source, &target, todo.id, target_index)
        };

        if source_block_id != target_block_id {
            tx.execute(
                &format!(
                    "UPDATE todos
                     SET hour_block_id = ?2,
                         updated_at = {NOW_MS_SQL}
                     WHERE id = ?1;"
                ),
                params![todo.id.to_string(), target_block_id.to_string()],
            )?;
        }
        write_assignments(&tx, &plan.target)?;
        write_assignments(&tx, &plan.source)?;

        let moved = load_required_todo(&tx, user_id, todo.id)?;
        tx.commit()?;
        Ok(MoveOutcome {
            todo: moved,
            source_block_id,
            placed_index: plan.placed_index,
        })
    }

    fn complete_all(&self, user_id: UserId, date: DateKey, today: DateKey) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let log = materialize_in(&tx, user_id, date, today)?.log;
        check_edit(&log, EditRule::CompleteAll, today)?;

        let changed = tx.execute(
            &format!(
                "UPDATE todos
                 SET status = 'done',
                     updated_at = {NOW_MS_SQL}
                 WHERE daily_log_id = ?1
                   AND status = 'pending';"
            ),
            [log.id.to_string()],
        )?;
        tx.commit()?;
        Ok(changed)
    }
}

/// Appends (or places at `index`) a new todo into `block_id`.
///
/// Caller owns the transaction and has already run edit gates.
pub(crate) fn insert_todo_in(
    conn: &Connection,
    log: &DailyLog,
    block_id: HourBlockId,
    input: &NewTodo,
    index: Option<i64>,
) -> RepoResult<TodoId> {
    let title = normalize_title(&input.title)?;
    let estimated_minutes = validate_minutes(input.estimated_minutes)?;
    let actual_minutes = input.actual_minutes.map(validate_minutes).transpose()?;

    let members = load_order_entries(conn, block_id)?;
    let todo_id = Uuid::new_v4();
    let plan = plan_insert(&members, todo_id, index.unwrap_or(members.len() as i64));
    let position = plan
        .target
        .iter()
        .find(|assignment| assignment.id == todo_id)
        .map(|assignment| assignment.sort_order)
        .unwrap_or(members.len() as i64);

    conn.execute(
        "INSERT INTO todos (
            id,
            daily_log_id,
            hour_block_id,
            title,
            estimated_minutes,
            actual_minutes,
            status,
            sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7);",
        params![
            todo_id.to_string(),
            log.id.to_string(),
            block_id.to_string(),
            title,
            estimated_minutes,
            actual_minutes,
            position,
        ],
    )?;
    let others: Vec<Assignment> = plan
        .target
        .into_iter()
        .filter(|assignment| assignment.id != todo_id)
        .collect();
    write_assignments(conn, &others)?;
    Ok(todo_id)
}

/// Reads current container members for ordering, inside the active transaction.
pub(crate) fn load_order_entries(
    conn: &Connection,
    block_id: HourBlockId,
) -> RepoResult<Vec<OrderEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, sort_order, created_at, rowid
         FROM todos
         WHERE hour_block_id = ?1;",
    )?;
    let mut rows = stmt.query([block_id.to_string()])?;
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        entries.push(OrderEntry {
            id: parse_uuid(&id_text, "todos.id")?,
            sort_order: row.get(1)?,
            created_at: row.get(2)?,
            insertion_seq: row.get(3)?,
        });
    }
    Ok(entries)
}

/// Writes only the assignments whose position changed.
pub(crate) fn write_assignments(conn: &Connection, plan: &[Assignment]) -> RepoResult<()> {
    let mut stmt = conn.prepare(&format!(
        "UPDATE todos
         SET sort_order = ?2,
             updated_at = {NOW_MS_SQL}
         WHERE id = ?1;"
    ))?;
    for assignment in plan.iter().filter(|assignment| assignment.is_changed()) {
        stmt.execute(params![assignment.id.to_string(), assignment.sort_order])?;
    }
    Ok(())
}

fn load_todo_in(conn: &Connection, user_id: UserId, todo_id: TodoId) -> RepoResult<Option<Todo>> {
    let mut stmt = conn.prepare(&format!(
        "{TODO_SELECT_SQL}
         INNER JOIN daily_logs d ON d.id = t.daily_log_id
         WHERE t.id = ?1
           AND d.user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![todo_id.to_string(), user_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_todo_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_required_todo(
    conn: &Connection,
    user_id: UserId,
    todo_id: TodoId,
) -> RepoResult<Todo> {
    load_todo_in(conn, user_id, todo_id)?.ok_or_else(|| RepoError::not_found(Entity::Todo, todo_id))
}

/// Loads a todo plus its day and runs the todo edit gate.
fn load_editable_todo(
    conn: &Connection,
    user_id: UserId,
    todo_id: TodoId,
    today: DateKey,
) -> RepoResult<(Todo, DailyLog)> {
    let todo = load_required_todo(conn, user_id, todo_id)?;
    let log = load_log_by_id_in(conn, todo.daily_log_id)?;
    check_edit(&log, EditRule::Todo, today)?;
    Ok((todo, log))
}

/// Returns the owning day of `block_id` if it belongs to `user_id`.
fn ensure_block_owned(
    conn: &Connection,
    user_id: UserId,
    block_id: HourBlockId,
) -> RepoResult<Uuid> {
    let mut stmt = conn.prepare(
        "SELECT b.daily_log_id
         FROM hour_blocks b
         INNER JOIN daily_logs d ON d.id = b.daily_log_id
         WHERE b.id = ?1
           AND d.user_id = ?2;",
    )?;
    let mut rows = stmt.query(params![block_id.to_string(), user_id.to_string()])?;
    if let Some(row) = rows.next()? {
        let day_text: String = row.get(0)?;
        return parse_uuid(&day_text, "hour_blocks.daily_log_id");
    }
    Err(RepoError::not_found(Entity::HourBlock, block_id))
}

pub(crate) fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id_text: String = row.get("id")?;
    let day_text: String = row.get("daily_log_id")?;
    let block_text: String = row.get("hour_block_id")?;
    let status_text: String = row.get("status")?;
    let status = TodoStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid todo status `{status_text}` in todos.status"))
    })?;

    Ok(Todo {
        id: parse_uuid(&id_text, "todos.id")?,
        daily_log_id: parse_uuid(&day_text, "todos.daily_log_id")?,
        hour_block_id: parse_uuid(&block_text, "todos.hour_block_id")?,
        title: row.get("title")?,
        estimated_minutes: row.get("estimated_minutes")?,
        actual_minutes: row.get("actual_minutes")?,
        status,
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
    })
}
