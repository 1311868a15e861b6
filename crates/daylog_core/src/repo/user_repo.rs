//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Stored `timezone` values were validated by the caller before writing.
//! - Users are never deleted by this engine.

use crate::db::NOW_MS_SQL;
use crate::model::day::{User, UserId};
use crate::repo::{ensure_connection_ready, parse_uuid, Entity, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Repository interface for users and their settings.
pub trait UserRepository {
    /// Creates one user with an already-validated zone name.
    fn create_user(&self, timezone: &str) -> RepoResult<User>;
    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>>;
    /// Replaces the zone used to derive the user's "today".
    fn set_timezone(&self, user_id: UserId, timezone: &str) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["users"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, timezone: &str) -> RepoResult<User> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO users (id, timezone) VALUES (?1, ?2);",
            params![id.to_string(), timezone],
        )?;
        Ok(User {
            id,
            timezone: timezone.to_string(),
        })
    }

    fn get_user(&self, user_id: UserId) -> RepoResult<Option<User>> {
        load_user(self.conn, user_id)
    }

    fn set_timezone(&self, user_id: UserId, timezone: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE users
                 SET timezone = ?2,
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![user_id.to_string(), timezone],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(Entity::User, user_id));
        }
        Ok(())
    }
}

pub(crate) fn load_user(conn: &Connection, user_id: UserId) -> RepoResult<Option<User>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT id, timezone FROM users WHERE id = ?1;",
            [user_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(id, timezone)| {
        Ok(User {
            id: parse_uuid(&id, "users.id")?,
            timezone,
        })
    })
    .transpose()
}

pub(crate) fn ensure_user_exists(conn: &Connection, user_id: UserId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        [user_id.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found(Entity::User, user_id));
    }
    Ok(())
}
