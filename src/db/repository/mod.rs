//! Repository layer: table-scoped database operations.
//!
//! Functions take a borrowed `Connection` and never open transactions
//! themselves; `PrescriptionStore` decides the transaction boundaries.

mod prescription;
mod statistics;

use chrono::NaiveDateTime;

use super::DatabaseError;

pub use prescription::*;
pub use statistics::*;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts both our millisecond stamps and SQLite's `datetime('now')` output.
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("invalid timestamp {s:?}: {e}")))
}
