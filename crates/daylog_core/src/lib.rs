//! Core engine for the daily log: day lifecycle, sweep and ordering.
//! This crate is the single source of truth for day-log business invariants.

pub mod config;
pub mod db;
pub mod enrichment;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_timeout, DbError};
pub use enrichment::{EnrichedText, EnrichmentError, SummaryEnricher};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::date_key::{DateKey, DateKeyError};
pub use model::day::{DailyLog, DayView, HourBlock, HourBlockView, User, UserId};
pub use model::lifecycle::{classify, DayStatus};
pub use model::score::{score, ScoreInput};
pub use model::todo::{BacklogItem, Todo, TodoStatus};
pub use repo::backlog_repo::{BacklogRepository, SqliteBacklogRepository};
pub use repo::day_repo::{DayRepository, SqliteDayRepository};
pub use repo::sweep_repo::{SqliteSweepRepository, SweepReport, SweepRepository};
pub use repo::todo_repo::{MoveOutcome, SqliteTodoRepository, TodoRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::backlog_service::BacklogService;
pub use service::day_service::{DayService, DaySnapshot, ScorePreview, WeekDay};
pub use service::summary_service::{SummaryReport, SummaryService};
pub use service::sweep_service::{SweepAllReport, SweepService};
pub use service::todo_service::TodoService;
pub use service::user_service::UserService;
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
