//! CLI entry point for local inspection of a day-log database.
//!
//! # Responsibility
//! - Verify `daylog_core` linkage (`ping`, `version`).
//! - Wire config, logging and storage for the `create-user`, `today`,
//!   `sweep` and `summary` commands.
//!
//! The database path and log settings come from `DAYLOG_*` variables.

use chrono::Utc;
use daylog_core::{
    init_from_config, open_db, CoreConfig, DayService, SqliteDayRepository,
    SqliteSweepRepository, SqliteUserRepository, SummaryService, SweepService, UserId,
    UserService,
};
use log::warn;
use rusqlite::Connection;
use std::error::Error;
use std::process::ExitCode;
use uuid::Uuid;

const USAGE: &str = "usage: daylog <ping|version|create-user [timezone]|today <user-id>|\
sweep <user-id>|summary <user-id> [date]>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    let command = args.first().map(String::as_str).unwrap_or("ping");
    match command {
        "ping" => {
            println!("daylog_core ping={}", daylog_core::ping());
            Ok(())
        }
        "version" => {
            println!("daylog_core version={}", daylog_core::core_version());
            Ok(())
        }
        "create-user" => {
            let (config, conn) = bootstrap()?;
            let timezone = args
                .get(1)
                .map(String::as_str)
                .unwrap_or(config.default_timezone.as_str());
            let users = UserService::new(SqliteUserRepository::try_new(&conn)?);
            let user = users.create_user(timezone)?;
            println!("user_id={} timezone={}", user.id, user.timezone);
            Ok(())
        }
        "today" => {
            let user_id = user_arg(args)?;
            let (_, conn) = bootstrap()?;
            show_today(&conn, user_id)
        }
        "sweep" => {
            let user_id = user_arg(args)?;
            let (_, conn) = bootstrap()?;
            let now = Utc::now();
            let today = UserService::new(SqliteUserRepository::try_new(&conn)?)
                .today_for_user(user_id, now)?;
            let sweeps = SweepService::new(SqliteSweepRepository::try_new(&conn)?);
            let report = sweeps.sweep_all_past_unswept(user_id, today, now)?;
            println!(
                "today={} attempted={} swept={} skipped={} failed={}",
                today, report.attempted, report.swept, report.skipped, report.failed
            );
            Ok(())
        }
        "summary" => {
            let user_id = user_arg(args)?;
            let (config, conn) = bootstrap()?;
            let today = UserService::new(SqliteUserRepository::try_new(&conn)?)
                .today_for_user(user_id, Utc::now())?;
            let date = args.get(2).cloned().unwrap_or_else(|| today.to_string());
            let summaries =
                SummaryService::from_config(SqliteDayRepository::try_new(&conn)?, &config, None);
            let report = summaries.generate(user_id, &date, today)?;
            println!("{}", report.summary);
            if let Err(err) = report.enrichment {
                println!("enrichment={err}");
            }
            Ok(())
        }
        other => Err(format!("unknown command `{other}`\n{USAGE}").into()),
    }
}

/// Sweeps stale days, then materializes and prints today.
fn show_today(conn: &Connection, user_id: UserId) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    let users = UserService::new(SqliteUserRepository::try_new(conn)?);
    let today = users.today_for_user(user_id, now)?;

    let sweeps = SweepService::new(SqliteSweepRepository::try_new(conn)?);
    let swept = sweeps.sweep_all_past_unswept(user_id, today, now)?;

    let days = DayService::new(SqliteDayRepository::try_new(conn)?);
    let snapshot = days.get_day(user_id, &today.to_string(), today)?;
    println!(
        "date={} status={} score={} pending={} todos={} swept_before={}",
        today,
        snapshot.view.log.status.as_str(),
        snapshot.preview.score,
        snapshot.view.pending_count(),
        snapshot.view.todos().count(),
        swept.swept
    );
    for view in snapshot.view.blocks.iter().filter(|view| !view.todos.is_empty()) {
        println!("{:02}:00 todos={}", view.block.hour, view.todos.len());
    }
    Ok(())
}

fn bootstrap() -> Result<(CoreConfig, Connection), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    if let Err(err) = init_from_config(&config) {
        eprintln!("warning: file logging disabled: {err}");
    }
    let conn = open_db(&config.db_path).map_err(|err| {
        warn!("event=cli_open module=cli status=error error={}", err);
        err
    })?;
    Ok((config, conn))
}

fn user_arg(args: &[String]) -> Result<UserId, Box<dyn Error>> {
    let raw = args.get(1).ok_or(USAGE)?;
    Ok(Uuid::parse_str(raw).map_err(|_| format!("invalid user id `{raw}`"))?)
}
