//! Backlog use-cases.

use crate::model::date_key::DateKey;
use crate::model::day::UserId;
use crate::model::todo::{BacklogItem, BacklogItemId, Todo};
use crate::repo::backlog_repo::BacklogRepository;
use crate::repo::{Entity, RepoError};
use crate::service::{parse_date_input, parse_hour_input, ServiceResult};
use log::info;

/// Backlog service facade over repository implementations.
pub struct BacklogService<R: BacklogRepository> {
    repo: R,
}

impl<R: BacklogRepository> BacklogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists the user's backlog, newest first.
    pub fn list_backlog(&self, user_id: UserId) -> ServiceResult<Vec<BacklogItem>> {
        Ok(self.repo.list_items(user_id)?)
    }

    pub fn get_item(&self, user_id: UserId, item_id: BacklogItemId) -> ServiceResult<BacklogItem> {
        self.repo
            .get_item(user_id, item_id)?
            .ok_or_else(|| RepoError::not_found(Entity::BacklogItem, item_id).into())
    }

    /// Restores one item as a pending todo appended to slot `hour` of `date`.
    ///
    /// Restoring into a day before `today`, or into a locked day, is
    /// `Forbidden` and leaves the item in place.
    pub fn restore(
        &self,
        user_id: UserId,
        item_id: BacklogItemId,
        date: &str,
        hour: u8,
        today: DateKey,
    ) -> ServiceResult<Todo> {
        let date = parse_date_input(date)?;
        let hour = parse_hour_input(hour)?;
        let todo = self.repo.restore_item(user_id, item_id, date, hour, today)?;
        info!(
            "event=backlog_restore module=service status=ok item_id={} date={} hour={} todo_id={}",
            item_id, date, hour, todo.id
        );
        Ok(todo)
    }

    pub fn discard(&self, user_id: UserId, item_id: BacklogItemId) -> ServiceResult<()> {
        self.repo.discard_item(user_id, item_id)?;
        info!(
            "event=backlog_discard module=service status=ok item_id={}",
            item_id
        );
        Ok(())
    }
}
