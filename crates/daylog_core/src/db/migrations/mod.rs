//! Ordered schema steps for the day-log store.
//!
//! Each step is one SQL script; the highest applied step is stored in
//! `PRAGMA user_version`. Pending steps run in a single transaction, so a
//! failing step leaves the file at its previous version.

use crate::db::{schema_version, DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(version, script)` pairs, strictly increasing.
const SCHEMA_STEPS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Newest schema version this build can write.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` up to `latest_version()` and returns the version it started from.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is ahead of this build.
/// - `Migration` naming the first step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<u32> {
    let found = schema_version(conn)?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }

    let pending: Vec<_> = SCHEMA_STEPS
        .iter()
        .filter(|(version, _)| *version > found)
        .collect();
    if pending.is_empty() {
        return Ok(found);
    }

    let tx = conn.transaction()?;
    for (version, script) in pending {
        let step = |source| DbError::Migration {
            version: *version,
            source,
        };
        tx.execute_batch(script).map_err(step)?;
        tx.pragma_update(None, "user_version", *version)
            .map_err(step)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        found, latest
    );
    Ok(found)
}
