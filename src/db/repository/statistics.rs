use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use super::{count_prescriptions, format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

pub fn get_statistics(conn: &Connection) -> Result<Statistics, DatabaseError> {
    let (total, patients, voice, updated_at) = conn.query_row(
        "SELECT total_prescriptions, total_patients, voice_commands, updated_at
         FROM statistics WHERE id = 1",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    )?;

    Ok(Statistics {
        total_prescriptions: total.max(0) as u64,
        total_patients: patients.max(0) as u64,
        voice_commands: voice.max(0) as u64,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Create the singleton row with zeros if it is missing.
pub fn ensure_statistics_row(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO statistics (id, total_prescriptions, total_patients, voice_commands)
         VALUES (1, 0, 0, 0)",
        [],
    )?;
    Ok(())
}

pub fn increment_total_prescriptions(conn: &Connection, now: &NaiveDateTime) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE statistics SET
         total_prescriptions = total_prescriptions + 1,
         updated_at = ?1
         WHERE id = 1",
        params![format_timestamp(now)],
    )?;
    require_statistics_row(changed)
}

/// Floored at zero.
pub fn decrement_total_prescriptions(conn: &Connection, now: &NaiveDateTime) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE statistics SET
         total_prescriptions = MAX(total_prescriptions - 1, 0),
         updated_at = ?1
         WHERE id = 1",
        params![format_timestamp(now)],
    )?;
    require_statistics_row(changed)
}

pub fn increment_voice_commands(conn: &Connection, now: &NaiveDateTime) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE statistics SET
         voice_commands = voice_commands + 1,
         updated_at = ?1
         WHERE id = 1",
        params![format_timestamp(now)],
    )?;
    require_statistics_row(changed)
}

/// Recalculate the prescription counter from the table itself.
///
/// Use when the counter may have drifted from the stored rows, e.g. after
/// restoring a database file written by an older build.
pub fn recalculate_statistics(conn: &Connection, now: &NaiveDateTime) -> Result<(), DatabaseError> {
    let total = count_prescriptions(conn)?;
    conn.execute(
        "UPDATE statistics SET
         total_prescriptions = ?1,
         updated_at = ?2
         WHERE id = 1",
        params![total, format_timestamp(now)],
    )?;
    Ok(())
}

/// Counter updates must hit the singleton row; a missing row fails the
/// surrounding transaction instead of silently dropping the update.
fn require_statistics_row(changed: usize) -> Result<(), DatabaseError> {
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "statistics".into(),
            id: "1".into(),
        });
    }
    Ok(())
}
