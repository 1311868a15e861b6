//! User settings use-cases.
//!
//! # Invariants
//! - Stored zone names always resolve through `parse_time_zone`.
//! - "Today" is derived from an explicit instant; this service never reads
//!   the process clock.

use crate::model::date_key::{parse_time_zone, today, DateKey};
use crate::model::day::{User, UserId};
use crate::repo::user_repo::UserRepository;
use crate::repo::{Entity, RepoError};
use crate::service::{ServiceError, ServiceResult};
use chrono::{DateTime, Utc};
use log::info;

/// User service facade over repository implementations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one user after validating the zone name.
    pub fn create_user(&self, timezone: &str) -> ServiceResult<User> {
        let zone = parse_time_zone(timezone)?;
        let user = self.repo.create_user(zone.name())?;
        info!(
            "event=user_create module=service status=ok user_id={} timezone={}",
            user.id, user.timezone
        );
        Ok(user)
    }

    pub fn get_user(&self, user_id: UserId) -> ServiceResult<User> {
        self.repo
            .get_user(user_id)?
            .ok_or_else(|| RepoError::not_found(Entity::User, user_id).into())
    }

    /// Replaces the zone used to derive the user's "today".
    pub fn set_timezone(&self, user_id: UserId, timezone: &str) -> ServiceResult<User> {
        let zone = parse_time_zone(timezone)?;
        self.repo.set_timezone(user_id, zone.name())?;
        info!(
            "event=user_timezone module=service status=ok user_id={} timezone={}",
            user_id,
            zone.name()
        );
        self.get_user(user_id)
    }

    /// Projects `instant` through the user's zone into a calendar date.
    pub fn today_for_user(
        &self,
        user_id: UserId,
        instant: DateTime<Utc>,
    ) -> ServiceResult<DateKey> {
        let user = self.get_user(user_id)?;
        today(&user.timezone, instant).map_err(ServiceError::from)
    }
}
