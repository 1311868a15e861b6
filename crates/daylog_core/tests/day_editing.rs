use chrono::{TimeZone, Utc};
use daylog_core::db::open_db_in_memory;
use daylog_core::model::day::MAX_SLOT_TEXT_CHARS;
use daylog_core::model::policy::EditDenied;
use daylog_core::repo::sweep_repo::{SqliteSweepRepository, SweepRepository};
use daylog_core::repo::todo_repo::{NewTodo, SqliteTodoRepository, TodoRepository};
use daylog_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use daylog_core::service::day_service::DayService;
use daylog_core::service::user_service::UserService;
use daylog_core::service::ServiceError;
use daylog_core::{DateKey, DayStatus, SqliteDayRepository, TodoStatus, UserId};
use rusqlite::Connection;

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
    (conn, user.id)
}

fn days(conn: &Connection) -> DayService<SqliteDayRepository<'_>> {
    DayService::new(SqliteDayRepository::try_new(conn).unwrap())
}

fn day_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM daily_logs;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn plan_and_reflection_follow_the_calendar() {
    let (conn, user_id) = setup();
    let service = days(&conn);
    let today = key(TODAY);

    let block = service
        .update_plan(user_id, "2026-10-18", 8, "gym", today)
        .unwrap();
    assert_eq!(block.planned_text, "gym");
    let block = service
        .update_reflection(user_id, "2026-10-16", 8, "slept in", today)
        .unwrap();
    assert_eq!(block.reflection_text, "slept in");
    service
        .update_plan(user_id, TODAY, 8, "write", today)
        .unwrap();
    service
        .update_reflection(user_id, TODAY, 8, "wrote", today)
        .unwrap();

    let err = service
        .update_plan(user_id, "2026-10-16", 9, "too late", today)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(EditDenied::PastDay(_))));
    let err = service
        .update_reflection(user_id, "2026-10-18", 9, "too early", today)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(EditDenied::FutureDay(_))));

    let snapshot = service.get_day(user_id, "2026-10-16", today).unwrap();
    let slot = &snapshot.view.block_for_hour(9).unwrap().block;
    assert!(slot.planned_text.is_empty());
}

#[test]
fn locked_day_rejects_slot_edits_until_unlocked() {
    let (conn, user_id) = setup();
    let service = days(&conn);
    let today = key(TODAY);

    let log = service.set_locked(user_id, TODAY, true, today).unwrap();
    assert!(log.is_locked);
    let err = service
        .update_plan(user_id, TODAY, 10, "focus", today)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(EditDenied::Locked(_))));

    service.set_locked(user_id, TODAY, false, today).unwrap();
    service
        .update_plan(user_id, TODAY, 10, "focus", today)
        .unwrap();
}

#[test]
fn oversized_text_and_scores_are_invalid_input() {
    let (conn, user_id) = setup();
    let service = days(&conn);
    let today = key(TODAY);

    let long = "x".repeat(MAX_SLOT_TEXT_CHARS + 1);
    let err = service
        .update_plan(user_id, TODAY, 10, &long, today)
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
    let exact = "x".repeat(MAX_SLOT_TEXT_CHARS);
    service
        .update_plan(user_id, TODAY, 10, &exact, today)
        .unwrap();

    let err = service
        .set_manual_score(user_id, TODAY, 101, today)
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
    let err = service
        .set_manual_score(user_id, TODAY, -1, today)
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn snapshot_preview_stays_live_until_sweep_freezes_manual_score() {
    let (conn, user_id) = setup();
    let todos = SqliteTodoRepository::try_new(&conn).unwrap();
    let today = key(TODAY);
    let done = todos
        .create_todo(
            user_id,
            today,
            9,
            &NewTodo {
                title: "stretch".to_string(),
                estimated_minutes: 15,
                actual_minutes: None,
            },
            today,
        )
        .unwrap();
    todos
        .create_todo(
            user_id,
            today,
            10,
            &NewTodo {
                title: "inbox".to_string(),
                estimated_minutes: 45,
                actual_minutes: None,
            },
            today,
        )
        .unwrap();
    todos
        .set_status(user_id, done.id, TodoStatus::Done, today)
        .unwrap();

    let service = days(&conn);
    let live = service.get_day(user_id, TODAY, today).unwrap();
    assert_eq!(live.view.blocks.len(), 24);
    assert_eq!(live.preview.score, 25);
    assert!(!live.preview.frozen);
    assert_eq!(live.preview.counters.total_estimated_minutes, 60);
    assert_eq!(live.preview.counters.completed_count, 1);

    service.set_manual_score(user_id, TODAY, 55, today).unwrap();
    let manual = service.get_day(user_id, TODAY, today).unwrap();
    assert_eq!(manual.view.log.score, Some(55));
    assert_eq!(manual.preview.score, 25);
    assert!(!manual.preview.frozen);

    SqliteSweepRepository::try_new(&conn)
        .unwrap()
        .sweep_day(user_id, today, 7)
        .unwrap()
        .unwrap();
    let frozen = service.get_day(user_id, TODAY, key("2026-10-18")).unwrap();
    assert_eq!(frozen.preview.score, 55);
    assert!(frozen.preview.frozen);
    assert_eq!(frozen.view.log.status, DayStatus::History);
    assert!(frozen
        .view
        .log
        .summary
        .as_deref()
        .unwrap()
        .contains("Score: 55/100"));
}

#[test]
fn week_overview_is_read_only() {
    let (conn, user_id) = setup();
    let todos = SqliteTodoRepository::try_new(&conn).unwrap();

    let monday_todo = todos
        .create_todo(
            user_id,
            key("2026-10-13"),
            9,
            &NewTodo {
                title: "plan sprint".to_string(),
                estimated_minutes: 10,
                actual_minutes: None,
            },
            key("2026-10-13"),
        )
        .unwrap();
    todos
        .set_status(user_id, monday_todo.id, TodoStatus::Done, key("2026-10-13"))
        .unwrap();
    SqliteSweepRepository::try_new(&conn)
        .unwrap()
        .sweep_day(user_id, key("2026-10-13"), 1)
        .unwrap()
        .unwrap();
    todos
        .create_todo(
            user_id,
            key("2026-10-16"),
            14,
            &NewTodo {
                title: "review".to_string(),
                estimated_minutes: 20,
                actual_minutes: None,
            },
            key("2026-10-16"),
        )
        .unwrap();
    assert_eq!(day_rows(&conn), 2);

    let week = days(&conn)
        .week_overview(user_id, TODAY, key(TODAY))
        .unwrap();
    assert_eq!(day_rows(&conn), 2);

    let dates: Vec<String> = week.iter().map(|day| day.date.to_string()).collect();
    assert_eq!(
        dates,
        vec![
            "2026-10-12",
            "2026-10-13",
            "2026-10-14",
            "2026-10-15",
            "2026-10-16",
            "2026-10-17",
            "2026-10-18",
        ]
    );

    assert_eq!(week[0].score, None);
    assert_eq!(week[0].status, DayStatus::History);
    assert!(week[1].swept);
    assert_eq!(week[1].score, Some(100));
    assert!(!week[4].swept);
    assert_eq!(week[4].score, Some(0));
    assert_eq!(week[4].status, DayStatus::History);
    assert_eq!(week[5].status, DayStatus::Execution);
    assert_eq!(week[5].score, None);
    assert_eq!(week[6].status, DayStatus::Planning);
}

#[test]
fn user_timezone_drives_today() {
    let conn = open_db_in_memory().unwrap();
    let users = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let err = users.create_user("Mars/Olympus_Mons").unwrap_err();
    assert!(matches!(err, ServiceError::UnknownTimeZone(_)));

    let user = users.create_user(" Pacific/Auckland ").unwrap();
    assert_eq!(user.timezone, "Pacific/Auckland");

    let instant = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
    assert_eq!(users.today_for_user(user.id, instant).unwrap(), key("2026-10-18"));

    let updated = users.set_timezone(user.id, "UTC").unwrap();
    assert_eq!(updated.timezone, "UTC");
    assert_eq!(users.today_for_user(user.id, instant).unwrap(), key(TODAY));

    let err = users.set_timezone(user.id, "Nowhere").unwrap_err();
    assert!(matches!(err, ServiceError::UnknownTimeZone(_)));
    assert_eq!(users.get_user(user.id).unwrap().timezone, "UTC");

    let early = Utc.with_ymd_and_hms(2026, 10, 17, 5, 0, 0).unwrap();
    users.set_timezone(user.id, "America/Los_Angeles").unwrap();
    assert_eq!(users.today_for_user(user.id, early).unwrap(), key("2026-10-16"));
}

#[test]
fn week_overview_at_end_of_calendar_keeps_stored_days() {
    let (conn, user_id) = setup();
    let service = days(&conn);
    let last = key("9999-12-31");
    service.ensure_day(user_id, "9999-12-31", last).unwrap();

    let week = service.week_overview(user_id, "9999-12-31", last).unwrap();
    let dates: Vec<String> = week.iter().map(|day| day.date.to_string()).collect();
    assert_eq!(
        dates,
        vec![
            "9999-12-27",
            "9999-12-28",
            "9999-12-29",
            "9999-12-30",
            "9999-12-31",
        ]
    );
    let stored = week.last().unwrap();
    assert_eq!(stored.status, DayStatus::Execution);
    assert_eq!(stored.score, Some(0));
}
