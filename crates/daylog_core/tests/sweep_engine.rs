use chrono::{TimeZone, Utc};
use daylog_core::db::open_db_in_memory;
use daylog_core::repo::backlog_repo::{BacklogRepository, SqliteBacklogRepository};
use daylog_core::repo::day_repo::{DayRepository, SlotText, SqliteDayRepository};
use daylog_core::repo::sweep_repo::{SqliteSweepRepository, SweepRepository};
use daylog_core::repo::todo_repo::{NewTodo, SqliteTodoRepository, TodoRepository};
use daylog_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use daylog_core::service::sweep_service::SweepService;
use daylog_core::service::ServiceError;
use daylog_core::{DateKey, DayStatus, Todo, TodoStatus, UserId};
use rusqlite::Connection;

const DAY: &str = "2026-10-16";
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

/// Adds a todo while `date` was still today.
fn add(
    conn: &Connection,
    user_id: UserId,
    date: &str,
    hour: u8,
    title: &str,
    minutes: i64,
) -> Todo {
    SqliteTodoRepository::try_new(conn)
        .unwrap()
        .create_todo(
            user_id,
            key(date),
            hour,
            &NewTodo {
                title: title.to_string(),
                estimated_minutes: minutes,
                actual_minutes: None,
            },
            key(date),
        )
        .unwrap()
}

fn mark_done(conn: &Connection, user_id: UserId, todo: &Todo, date: &str) {
    SqliteTodoRepository::try_new(conn)
        .unwrap()
        .set_status(user_id, todo.id, TodoStatus::Done, key(date))
        .unwrap();
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

#[test]
fn sweep_freezes_score_and_defers_pending_work() {
    let (conn, user_id) = setup();
    let done = add(&conn, user_id, DAY, 9, "write report", 10);
    let pending = add(&conn, user_id, DAY, 14, "review notes", 20);
    mark_done(&conn, user_id, &done, DAY);

    let sweeps = SqliteSweepRepository::try_new(&conn).unwrap();
    let report = sweeps
        .sweep_day(user_id, key(DAY), 1_760_000_000_000)
        .unwrap()
        .unwrap();
    assert_eq!(report.score, 33);
    assert_eq!(report.deferred_count(), 1);
    assert_eq!(report.swept_at, 1_760_000_000_000);
    assert!(report
        .summary
        .contains("Score: 33/100 (10 of 30 estimated minutes, 1 done, 1 deferred)"));
    assert!(report.summary.contains("  [x] write report (10m)"));
    assert!(report.summary.contains("  [ ] review notes (20m)"));

    let day = SqliteDayRepository::try_new(&conn)
        .unwrap()
        .get_day(user_id, key(DAY))
        .unwrap()
        .unwrap();
    assert_eq!(day.status, DayStatus::History);
    assert!(day.is_locked);
    assert_eq!(day.score, Some(33));
    assert_eq!(day.swept_at, Some(1_760_000_000_000));
    assert_eq!(day.summary.as_deref(), Some(report.summary.as_str()));

    let backlog = SqliteBacklogRepository::try_new(&conn)
        .unwrap()
        .list_items(user_id)
        .unwrap();
    assert_eq!(backlog.len(), 1);
    assert_eq!(backlog[0].id, report.backlog_item_ids[0]);
    assert_eq!(backlog[0].title, "review notes");
    assert_eq!(backlog[0].estimated_minutes, 20);
    assert_eq!(backlog[0].source_date, Some(key(DAY)));
    assert_eq!(backlog[0].source_hour, Some(14));

    let todos = SqliteTodoRepository::try_new(&conn).unwrap();
    assert!(todos.get_todo(user_id, pending.id).unwrap().is_none());
    assert!(todos.get_todo(user_id, done.id).unwrap().is_some());
}

#[test]
fn second_sweep_is_a_no_op() {
    let (conn, user_id) = setup();
    add(&conn, user_id, DAY, 9, "pending", 15);
    let sweeps = SqliteSweepRepository::try_new(&conn).unwrap();

    let first = sweeps.sweep_day(user_id, key(DAY), 1_000).unwrap().unwrap();
    assert!(sweeps.sweep_day(user_id, key(DAY), 2_000).unwrap().is_none());

    let day = SqliteDayRepository::try_new(&conn)
        .unwrap()
        .get_day(user_id, key(DAY))
        .unwrap()
        .unwrap();
    assert_eq!(day.swept_at, Some(1_000));
    assert_eq!(day.score, Some(first.score));
    assert_eq!(day.summary, Some(first.summary));
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM backlog_items;"), 1);
}

#[test]
fn sweep_of_missing_day_does_nothing() {
    let (conn, user_id) = setup();
    let sweeps = SqliteSweepRepository::try_new(&conn).unwrap();
    assert!(sweeps.sweep_day(user_id, key(DAY), 1).unwrap().is_none());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM daily_logs;"), 0);
}

#[test]
fn sweep_keeps_manual_score_and_handles_empty_days() {
    let (conn, user_id) = setup();
    let days = SqliteDayRepository::try_new(&conn).unwrap();
    days.ensure_day(user_id, key(DAY), key(DAY)).unwrap();
    days.set_score(user_id, key(DAY), 90, key(DAY)).unwrap();
    days.ensure_day(user_id, key("2026-10-15"), key(TODAY))
        .unwrap();

    let sweeps = SqliteSweepRepository::try_new(&conn).unwrap();
    let manual = sweeps.sweep_day(user_id, key(DAY), 5).unwrap().unwrap();
    assert_eq!(manual.score, 90);

    let empty = sweeps
        .sweep_day(user_id, key("2026-10-15"), 5)
        .unwrap()
        .unwrap();
    assert_eq!(empty.score, 0);
    assert!(empty.backlog_item_ids.is_empty());
    assert!(empty.summary.ends_with("No activity recorded."));

    let err = days
        .set_score(user_id, key(DAY), 10, key(TODAY))
        .unwrap_err();
    assert!(err.to_string().contains("swept"));
    let err = days
        .set_locked(user_id, key(DAY), false, key(TODAY))
        .unwrap_err();
    assert!(err.to_string().contains("swept"));
}

#[test]
fn failing_sweep_leaves_day_open() {
    let (conn, user_id) = setup();
    add(&conn, user_id, DAY, 8, "fine", 5);
    add(&conn, user_id, DAY, 9, "explode", 5);
    conn.execute_batch(
        "CREATE TRIGGER fail_backlog_insert
         BEFORE INSERT ON backlog_items
         WHEN NEW.title = 'explode'
         BEGIN
             SELECT RAISE(ABORT, 'simulated failure');
         END;",
    )
    .unwrap();

    let sweeps = SqliteSweepRepository::try_new(&conn).unwrap();
    assert!(sweeps.sweep_day(user_id, key(DAY), 1).is_err());

    let day = SqliteDayRepository::try_new(&conn)
        .unwrap()
        .get_day(user_id, key(DAY))
        .unwrap()
        .unwrap();
    assert!(day.swept_at.is_none());
    assert!(!day.is_locked);
    assert!(day.score.is_none());
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM backlog_items;"), 0);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM todos;"), 2);
}

#[test]
fn sweep_all_closes_past_days_and_continues_after_failures() {
    let (conn, user_id) = setup();
    add(&conn, user_id, "2026-10-13", 9, "old", 10);
    add(&conn, user_id, "2026-10-14", 9, "explode", 10);
    add(&conn, user_id, "2026-10-15", 9, "recent", 10);
    add(&conn, user_id, TODAY, 9, "today", 10);
    add(&conn, user_id, "2026-10-20", 9, "future", 10);
    conn.execute_batch(
        "CREATE TRIGGER fail_backlog_insert
         BEFORE INSERT ON backlog_items
         WHEN NEW.title = 'explode'
         BEGIN
             SELECT RAISE(ABORT, 'simulated failure');
         END;",
    )
    .unwrap();

    let sweeps = SqliteSweepRepository::try_new(&conn).unwrap();
    assert_eq!(
        sweeps.list_unswept_before(user_id, key(TODAY)).unwrap(),
        vec![key("2026-10-13"), key("2026-10-14"), key("2026-10-15")]
    );

    let service = SweepService::new(sweeps);
    let now = Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap();
    let report = service
        .sweep_all_past_unswept(user_id, key(TODAY), now)
        .unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.swept, 2);
    assert_eq!(report.failed, 1);

    let remaining = SqliteSweepRepository::try_new(&conn)
        .unwrap()
        .list_unswept_before(user_id, key(TODAY))
        .unwrap();
    assert_eq!(remaining, vec![key("2026-10-14")]);

    let days = SqliteDayRepository::try_new(&conn).unwrap();
    let today = days.get_day(user_id, key(TODAY)).unwrap().unwrap();
    assert!(today.swept_at.is_none());
    let swept = days.get_day(user_id, key("2026-10-13")).unwrap().unwrap();
    assert_eq!(swept.swept_at, Some(now.timestamp_millis()));
}

#[test]
fn sweep_one_validates_date_input() {
    let (conn, user_id) = setup();
    let service = SweepService::new(SqliteSweepRepository::try_new(&conn).unwrap());
    let now = Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap();
    let err = service.sweep_one(user_id, "16/10/2026", now).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidDateKey(_)));
}

#[test]
fn swept_day_rejects_further_edits() {
    let (conn, user_id) = setup();
    let todo = add(&conn, user_id, DAY, 9, "done", 10);
    mark_done(&conn, user_id, &todo, DAY);
    SqliteSweepRepository::try_new(&conn)
        .unwrap()
        .sweep_day(user_id, key(DAY), 1)
        .unwrap()
        .unwrap();

    let days = SqliteDayRepository::try_new(&conn).unwrap();
    let err = days
        .update_slot_text(user_id, key(DAY), 9, SlotText::Reflection, "late", key(TODAY))
        .unwrap_err();
    assert!(err.to_string().contains("locked"));
    let err = SqliteTodoRepository::try_new(&conn)
        .unwrap()
        .set_status(user_id, todo.id, TodoStatus::Pending, key(DAY))
        .unwrap_err();
    assert!(err.to_string().contains("locked"));
}
