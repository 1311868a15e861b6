//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Run every structural mutation (materialize, resequence, sweep, restore)
//!   inside one `IMMEDIATE` transaction.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `Forbidden`,
//!   `Conflict`) in addition to DB transport errors.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Rows owned by another user are reported as `NotFound`.

use crate::db::migrations::latest_version;
use crate::db::{schema_version, DbError};
use crate::model::date_key::DateKey;
use crate::model::day::DayValidationError;
use crate::model::policy::EditDenied;
use crate::model::todo::TodoValidationError;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod backlog_repo;
pub mod day_repo;
pub mod sweep_repo;
pub mod todo_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Stored entity kinds, used in not-found reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    DailyLog,
    HourBlock,
    Todo,
    BacklogItem,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::DailyLog => "daily log",
            Self::HourBlock => "hour block",
            Self::Todo => "todo",
            Self::BacklogItem => "backlog item",
        }
    }
}

/// Repository error shared by every day-log repository.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: Entity, key: String },
    /// Mutation refused by an edit gate.
    Forbidden(EditDenied),
    /// Lost a race against a concurrent equivalent write; safe to retry.
    Conflict(String),
    Validation(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: Entity, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{} not found: {key}", entity.as_str()),
            Self::Forbidden(reason) => write!(f, "{reason}"),
            Self::Conflict(message) => write!(f, "concurrent write conflict: {message}"),
            Self::Validation(message) => write!(f, "{message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "day-log repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "day-log repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted day-log data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Forbidden(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if is_conflict_error(&value) {
            return Self::Conflict(value.to_string());
        }
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EditDenied> for RepoError {
    fn from(value: EditDenied) -> Self {
        Self::Forbidden(value)
    }
}

impl From<DayValidationError> for RepoError {
    fn from(value: DayValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Busy/locked stores and unique-key collisions are retryable races.
fn is_conflict_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => match inner.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => true,
            ErrorCode::ConstraintViolation => matches!(
                inner.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ),
            _ => false,
        },
        _ => false,
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_date(value: &str, column: &'static str) -> RepoResult<DateKey> {
    DateKey::parse(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_hour(value: i64, column: &'static str) -> RepoResult<u8> {
    u8::try_from(value)
        .ok()
        .filter(|hour| *hour < 24)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid hour `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Verifies the connection is migrated and carries the given tables.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [*table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
