//! Core use-case services.
//!
//! # Responsibility
//! - Parse and validate external inputs (date strings, zone names, hours)
//!   before any store access.
//! - Orchestrate repository calls into use-case level APIs.
//! - Map repository failures onto one discrete error taxonomy.
//!
//! # Invariants
//! - `InvalidDateKey` and `UnknownTimeZone` are raised before touching storage.
//! - Idempotent steps (materialize, sweep) absorb `Conflict` by retrying.

use crate::model::date_key::{DateKey, DateKeyError};
use crate::model::day::{validate_hour, DayValidationError};
use crate::model::policy::EditDenied;
use crate::repo::{Entity, RepoError, RepoResult};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod backlog_service;
pub mod day_service;
pub mod summary_service;
pub mod sweep_service;
pub mod todo_service;
pub mod user_service;

/// Attempts per idempotent operation before `Conflict` is surfaced.
pub const MAX_CONFLICT_ATTEMPTS: usize = 3;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error taxonomy returned to callers of the engine.
#[derive(Debug)]
pub enum ServiceError {
    InvalidDateKey(String),
    UnknownTimeZone(String),
    /// Referenced row is missing or owned by another user.
    NotFound { entity: Entity, key: String },
    Forbidden(EditDenied),
    /// Concurrent equivalent write won; safe to retry.
    Conflict(String),
    InvalidInput(String),
    /// Text enrichment failed; never aborts the enclosing operation.
    EnrichmentUnavailable(String),
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDateKey(value) => write!(f, "invalid date key: `{value}`"),
            Self::UnknownTimeZone(value) => write!(f, "unknown time zone: `{value}`"),
            Self::NotFound { entity, key } => write!(f, "{} not found: {key}", entity.as_str()),
            Self::Forbidden(reason) => write!(f, "forbidden: {reason}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::EnrichmentUnavailable(message) => {
                write!(f, "enrichment unavailable: {message}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forbidden(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            RepoError::Forbidden(reason) => Self::Forbidden(reason),
            RepoError::Conflict(message) => Self::Conflict(message),
            RepoError::Validation(message) => Self::InvalidInput(message),
            other => Self::Repo(other),
        }
    }
}

impl From<DateKeyError> for ServiceError {
    fn from(value: DateKeyError) -> Self {
        match value {
            DateKeyError::InvalidDateKey(input) => Self::InvalidDateKey(input),
            DateKeyError::UnknownTimeZone(input) => Self::UnknownTimeZone(input),
        }
    }
}

impl From<DayValidationError> for ServiceError {
    fn from(value: DayValidationError) -> Self {
        Self::InvalidInput(value.to_string())
    }
}

/// Parses one externally supplied date.
pub(crate) fn parse_date_input(value: &str) -> ServiceResult<DateKey> {
    Ok(DateKey::parse(value)?)
}

pub(crate) fn parse_hour_input(hour: u8) -> ServiceResult<u8> {
    Ok(validate_hour(i64::from(hour))?)
}

/// Re-runs an idempotent repository step while it loses races.
pub(crate) fn retry_on_conflict<T>(
    operation: &'static str,
    mut step: impl FnMut() -> RepoResult<T>,
) -> RepoResult<T> {
    let mut attempt = 1;
    loop {
        match step() {
            Err(err) if err.is_conflict() && attempt < MAX_CONFLICT_ATTEMPTS => {
                warn!(
                    "event=conflict_retry module=service status=retry op={} attempt={}",
                    operation, attempt
                );
                attempt += 1;
            }
            result => return result,
        }
    }
}
