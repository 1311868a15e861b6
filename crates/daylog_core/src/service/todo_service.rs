//! Todo use-cases.
//!
//! # Invariants
//! - Every structural change leaves each affected hour block with dense
//!   `sort_order` values `0..n`.
//! - Todo mutations on locked or past days are `Forbidden`.

use crate::model::date_key::DateKey;
use crate::model::day::{HourBlockId, UserId};
use crate::model::todo::{Todo, TodoId};
use crate::repo::todo_repo::{MoveOutcome, NewTodo, TodoRepository};
use crate::repo::{Entity, RepoError};
use crate::service::{parse_date_input, parse_hour_input, ServiceResult};
use log::info;

/// Todo service facade over repository implementations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Appends a pending todo to slot `hour` of `date`.
    pub fn create_todo(
        &self,
        user_id: UserId,
        date: &str,
        hour: u8,
        title: &str,
        estimated_minutes: i64,
        today: DateKey,
    ) -> ServiceResult<Todo> {
        let date = parse_date_input(date)?;
        let hour = parse_hour_input(hour)?;
        let todo = self.repo.create_todo(
            user_id,
            date,
            hour,
            &NewTodo {
                title: title.to_string(),
                estimated_minutes,
                actual_minutes: None,
            },
            today,
        )?;
        info!(
            "event=todo_create module=service status=ok date={} hour={} todo_id={} sort_order={}",
            date, hour, todo.id, todo.sort_order
        );
        Ok(todo)
    }

    pub fn get_todo(&self, user_id: UserId, todo_id: TodoId) -> ServiceResult<Todo> {
        self.repo
            .get_todo(user_id, todo_id)?
            .ok_or_else(|| RepoError::not_found(Entity::Todo, todo_id).into())
    }

    pub fn list_block(&self, user_id: UserId, block_id: HourBlockId) -> ServiceResult<Vec<Todo>> {
        Ok(self.repo.list_block(user_id, block_id)?)
    }

    /// Flips Pending and Done in one write transaction.
    pub fn toggle_todo(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        today: DateKey,
    ) -> ServiceResult<Todo> {
        let todo = self.repo.toggle_status(user_id, todo_id, today)?;
        info!(
            "event=todo_toggle module=service status=ok todo_id={} todo_status={}",
            todo.id,
            todo.status.as_str()
        );
        Ok(todo)
    }

    pub fn set_actual_minutes(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        minutes: Option<i64>,
        today: DateKey,
    ) -> ServiceResult<Todo> {
        Ok(self
            .repo
            .set_actual_minutes(user_id, todo_id, minutes, today)?)
    }

    /// Deletes a todo and closes the gap in its block.
    pub fn delete_todo(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        today: DateKey,
    ) -> ServiceResult<()> {
        self.repo.delete_todo(user_id, todo_id, today)?;
        info!(
            "event=todo_delete module=service status=ok todo_id={}",
            todo_id
        );
        Ok(())
    }

    /// Moves a todo to `target_index` of another (or the same) block of its day.
    ///
    /// Out-of-range indices are clamped; moving across days is `Forbidden`.
    pub fn move_todo(
        &self,
        user_id: UserId,
        todo_id: TodoId,
        target_block_id: HourBlockId,
        target_index: i64,
        today: DateKey,
    ) -> ServiceResult<MoveOutcome> {
        let outcome = self
            .repo
            .move_todo(user_id, todo_id, target_block_id, target_index, today)?;
        info!(
            "event=todo_move module=service status=ok todo_id={} cross_block={} requested_index={} placed_index={}",
            todo_id,
            outcome.source_block_id != target_block_id,
            target_index,
            outcome.placed_index
        );
        Ok(outcome)
    }

    /// Marks every pending todo of today done; returns how many changed.
    pub fn complete_all(
        &self,
        user_id: UserId,
        date: &str,
        today: DateKey,
    ) -> ServiceResult<usize> {
        let date = parse_date_input(date)?;
        let changed = self.repo.complete_all(user_id, date, today)?;
        info!(
            "event=todo_complete_all module=service status=ok date={} changed={}",
            date, changed
        );
        Ok(changed)
    }
}
