use daylog_core::config::{CoreConfig, ENV_ENRICHMENT_TIMEOUT_SECS};
use daylog_core::db::open_db_in_memory;
use daylog_core::enrichment::{EnrichedText, EnrichmentError, SummaryEnricher};
use daylog_core::repo::day_repo::{DayRepository, SlotText, SqliteDayRepository};
use daylog_core::repo::sweep_repo::{SqliteSweepRepository, SweepRepository};
use daylog_core::repo::todo_repo::{NewTodo, SqliteTodoRepository, TodoRepository};
use daylog_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use daylog_core::service::summary_service::SummaryService;
use daylog_core::service::ServiceError;
use daylog_core::{DateKey, UserId};
use rusqlite::Connection;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TODAY: &str = "2026-10-17";

fn key(value: &str) -> DateKey {
    DateKey::parse(value).unwrap()
}

fn setup() -> (Connection, UserId) {
    let conn = open_db_in_memory().unwrap();
    let user = SqliteUserRepository::try_new(&conn)
        .unwrap()
        .create_user("UTC")
        .unwrap();
    let todos = SqliteTodoRepository::try_new(&conn).unwrap();
    todos
        .create_todo(
            user.id,
            key(TODAY),
            9,
            &NewTodo {
                title: "ship release".to_string(),
                estimated_minutes: 60,
                actual_minutes: None,
            },
            key(TODAY),
        )
        .unwrap();
    SqliteDayRepository::try_new(&conn)
        .unwrap()
        .update_slot_text(
            user.id,
            key(TODAY),
            9,
            SlotText::Plan,
            "release\nthen lunch",
            key(TODAY),
        )
        .unwrap();
    (conn, user.id)
}

struct Echo;

impl SummaryEnricher for Echo {
    fn enrich(&self, date: DateKey, summary: &str) -> Result<EnrichedText, EnrichmentError> {
        Ok(EnrichedText {
            text: format!("{date}: {} lines", summary.lines().count()),
            model: "echo-1".to_string(),
        })
    }
}

struct Stalled;

impl SummaryEnricher for Stalled {
    fn enrich(&self, _date: DateKey, _summary: &str) -> Result<EnrichedText, EnrichmentError> {
        thread::sleep(Duration::from_millis(300));
        Ok(EnrichedText {
            text: "too late".to_string(),
            model: "stalled".to_string(),
        })
    }
}

struct Sleepy(Duration);

impl SummaryEnricher for Sleepy {
    fn enrich(&self, _date: DateKey, _summary: &str) -> Result<EnrichedText, EnrichmentError> {
        thread::sleep(self.0);
        Ok(EnrichedText {
            text: "eventually".to_string(),
            model: "sleepy".to_string(),
        })
    }
}

struct MissingCredentials;

impl SummaryEnricher for MissingCredentials {
    fn enrich(&self, _date: DateKey, _summary: &str) -> Result<EnrichedText, EnrichmentError> {
        Err(EnrichmentError::Backend("missing api key".to_string()))
    }
}

fn stored(conn: &Connection, user_id: UserId) -> (Option<String>, Option<String>, Option<String>) {
    let day = SqliteDayRepository::try_new(conn)
        .unwrap()
        .get_day(user_id, key(TODAY))
        .unwrap()
        .unwrap();
    (day.summary, day.ai_summary, day.ai_model)
}

#[test]
fn generate_persists_summary_and_enrichment() {
    let (conn, user_id) = setup();
    let service = SummaryService::new(SqliteDayRepository::try_new(&conn).unwrap())
        .with_enricher(Arc::new(Echo), Duration::from_secs(2));

    let report = service.generate(user_id, TODAY, key(TODAY)).unwrap();
    let expected = [
        "Summary for 2026-10-17",
        "Score: 0/100 (0 of 60 estimated minutes, 0 done, 1 deferred)",
        "",
        "09:00",
        "  Plan: release / then lunch",
        "  [ ] ship release (60m)",
    ]
    .join("\n");
    assert_eq!(report.summary, expected);
    assert_eq!(report.score, 0);
    let enriched = report.enrichment.unwrap();
    assert_eq!(enriched.model, "echo-1");

    let (summary, ai_summary, ai_model) = stored(&conn, user_id);
    assert_eq!(summary.as_deref(), Some(expected.as_str()));
    assert_eq!(ai_summary.as_deref(), Some("2026-10-17: 6 lines"));
    assert_eq!(ai_model.as_deref(), Some("echo-1"));
}

#[test]
fn enrichment_timeout_keeps_previous_ai_summary() {
    let (conn, user_id) = setup();
    let repo = SqliteDayRepository::try_new(&conn).unwrap();
    let day = repo.get_day(user_id, key(TODAY)).unwrap().unwrap();
    repo.save_ai_summary(day.id, "earlier prose", "echo-0").unwrap();

    let service = SummaryService::new(repo)
        .with_enricher(Arc::new(Stalled), Duration::from_millis(20));
    let report = service.generate(user_id, TODAY, key(TODAY)).unwrap();

    match report.enrichment {
        Err(ServiceError::EnrichmentUnavailable(reason)) => assert!(reason.contains("timed out")),
        other => panic!("unexpected enrichment outcome: {other:?}"),
    }
    let (summary, ai_summary, ai_model) = stored(&conn, user_id);
    assert_eq!(summary.as_deref(), Some(report.summary.as_str()));
    assert_eq!(ai_summary.as_deref(), Some("earlier prose"));
    assert_eq!(ai_model.as_deref(), Some("echo-0"));
}

#[test]
fn enricher_errors_and_missing_enricher_are_non_fatal() {
    let (conn, user_id) = setup();

    let failing = SummaryService::new(SqliteDayRepository::try_new(&conn).unwrap())
        .with_enricher(Arc::new(MissingCredentials), Duration::from_secs(1));
    let report = failing.generate(user_id, TODAY, key(TODAY)).unwrap();
    assert!(matches!(
        report.enrichment,
        Err(ServiceError::EnrichmentUnavailable(ref reason)) if reason.contains("missing api key")
    ));

    let bare = SummaryService::new(SqliteDayRepository::try_new(&conn).unwrap());
    let report = bare.generate(user_id, TODAY, key(TODAY)).unwrap();
    assert!(matches!(
        report.enrichment,
        Err(ServiceError::EnrichmentUnavailable(_))
    ));
    assert!(stored(&conn, user_id).0.is_some());
    assert!(stored(&conn, user_id).1.is_none());
}

#[test]
fn swept_day_reports_frozen_summary() {
    let (conn, user_id) = setup();
    let frozen = SqliteSweepRepository::try_new(&conn)
        .unwrap()
        .sweep_day(user_id, key(TODAY), 1)
        .unwrap()
        .unwrap();

    let service = SummaryService::new(SqliteDayRepository::try_new(&conn).unwrap())
        .with_enricher(Arc::new(Echo), Duration::from_secs(2));
    let report = service
        .generate(user_id, TODAY, key("2026-10-18"))
        .unwrap();
    assert_eq!(report.summary, frozen.summary);
    assert_eq!(report.score, frozen.score);
    assert!(report.enrichment.is_ok());
    assert_eq!(stored(&conn, user_id).0, Some(frozen.summary));
}

#[test]
fn configured_timeout_bounds_enrichment() {
    let (conn, user_id) = setup();
    let config = CoreConfig::from_lookup(|name| {
        (name == ENV_ENRICHMENT_TIMEOUT_SECS).then(|| "1".to_string())
    })
    .unwrap();

    let slow: Arc<dyn SummaryEnricher> = Arc::new(Sleepy(Duration::from_millis(1500)));
    let service = SummaryService::from_config(
        SqliteDayRepository::try_new(&conn).unwrap(),
        &config,
        Some(slow),
    );
    assert_eq!(service.timeout(), Duration::from_secs(1));

    let report = service.generate(user_id, TODAY, key(TODAY)).unwrap();
    match report.enrichment {
        Err(ServiceError::EnrichmentUnavailable(reason)) => {
            assert!(reason.contains("timed out after 1000ms"), "{reason}")
        }
        other => panic!("unexpected enrichment outcome: {other:?}"),
    }
    assert!(stored(&conn, user_id).1.is_none());

    let fast: Arc<dyn SummaryEnricher> = Arc::new(Sleepy(Duration::from_millis(10)));
    let quick = SummaryService::from_config(
        SqliteDayRepository::try_new(&conn).unwrap(),
        &config,
        Some(fast),
    );
    let report = quick.generate(user_id, TODAY, key(TODAY)).unwrap();
    assert_eq!(report.enrichment.unwrap().model, "sleepy");
}
