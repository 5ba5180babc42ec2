use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::{format_timestamp, parse_timestamp};
use crate::db::DatabaseError;
use crate::models::*;

const PRESCRIPTION_COLUMNS: &str = "id, patient_name, patient_age, patient_gender, symptoms,
     diagnosis, medications, advice, follow_up, created_at, updated_at";

pub fn insert_prescription(
    conn: &Connection,
    patient: &PatientDetails,
    draft: &PrescriptionDraft,
    now: &NaiveDateTime,
) -> Result<i64, DatabaseError> {
    patient.validate()?;
    let medications = serde_json::to_string(&draft.medications)?;
    let stamp = format_timestamp(now);
    conn.execute(
        "INSERT INTO prescriptions (patient_name, patient_age, patient_gender, symptoms,
         diagnosis, medications, advice, follow_up, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            patient.name,
            patient.age,
            patient.gender,
            patient.symptoms,
            draft.diagnosis,
            medications,
            draft.advice,
            draft.follow_up,
            stamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_prescription(
    conn: &Connection,
    id: i64,
) -> Result<Option<PrescriptionRecord>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = ?1"),
            params![id],
            prescription_row_from_rusqlite,
        )
        .optional()?;

    row.map(prescription_from_row).transpose()
}

/// Most recent first. Ties on `created_at` fall back to insertion order.
pub fn list_prescriptions(
    conn: &Connection,
    limit: u32,
    offset: u32,
) -> Result<Vec<PrescriptionRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
         ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
    ))?;

    let rows = stmt.query_map(params![limit, offset], prescription_row_from_rusqlite)?;
    prescription_rows_to_vec(rows)
}

/// Case-insensitive substring match over patient name, symptoms and diagnosis.
///
/// Folding goes through the connection's `fold_case` function, so non-ASCII
/// text matches too. The query is a literal substring; `%` and `_` are not
/// wildcards.
pub fn search_prescriptions(
    conn: &Connection,
    query: &str,
) -> Result<Vec<PrescriptionRecord>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions
         WHERE instr(fold_case(patient_name), fold_case(?1)) > 0
            OR instr(fold_case(symptoms), fold_case(?1)) > 0
            OR instr(fold_case(diagnosis), fold_case(?1)) > 0
         ORDER BY created_at DESC, id DESC"
    ))?;

    let rows = stmt.query_map(params![query], prescription_row_from_rusqlite)?;
    prescription_rows_to_vec(rows)
}

/// Returns whether a row was removed.
pub fn delete_prescription(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let removed = conn.execute("DELETE FROM prescriptions WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

pub fn count_prescriptions(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM prescriptions", [], |r| r.get(0))?;
    Ok(count)
}

// Internal row type for PrescriptionRecord mapping
struct PrescriptionRow {
    id: i64,
    patient_name: String,
    patient_age: i64,
    patient_gender: String,
    symptoms: String,
    diagnosis: Option<String>,
    medications: Option<String>,
    advice: Option<String>,
    follow_up: Option<String>,
    created_at: String,
    updated_at: String,
}

fn prescription_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PrescriptionRow, rusqlite::Error> {
    Ok(PrescriptionRow {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        patient_age: row.get(2)?,
        patient_gender: row.get(3)?,
        symptoms: row.get(4)?,
        diagnosis: row.get(5)?,
        medications: row.get(6)?,
        advice: row.get(7)?,
        follow_up: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn prescription_from_row(row: PrescriptionRow) -> Result<PrescriptionRecord, DatabaseError> {
    let medications = match row.medications.as_deref() {
        None | Some("") => Vec::new(),
        Some(blob) => serde_json::from_str(blob)?,
    };
    let patient_age = u32::try_from(row.patient_age).map_err(|_| {
        DatabaseError::ConstraintViolation(format!("invalid stored age {}", row.patient_age))
    })?;

    Ok(PrescriptionRecord {
        id: row.id,
        patient_name: row.patient_name,
        patient_age,
        patient_gender: row.patient_gender,
        symptoms: row.symptoms,
        diagnosis: row.diagnosis.unwrap_or_default(),
        medications,
        advice: row.advice.unwrap_or_default(),
        follow_up: row.follow_up.unwrap_or_default(),
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn prescription_rows_to_vec<I>(rows: I) -> Result<Vec<PrescriptionRecord>, DatabaseError>
where
    I: Iterator<Item = Result<PrescriptionRow, rusqlite::Error>>,
{
    let mut records = Vec::new();
    for row in rows {
        records.push(prescription_from_row(row?)?);
    }
    Ok(records)
}
