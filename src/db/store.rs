//! Async prescription store over a single shared SQLite handle.
//!
//! `rusqlite` is blocking, so every operation runs on the blocking pool
//! behind one `Mutex`. The mutex is the single-writer queue: counter
//! updates can never interleave, and each mutating call commits its record
//! change and its counter change in one transaction.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::*;

/// Cloneable handle to the local prescription database.
///
/// Clones share the same connection. After [`PrescriptionStore::close`]
/// every operation on any clone fails with [`DatabaseError::StoreClosed`].
#[derive(Clone)]
pub struct PrescriptionStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl PrescriptionStore {
    /// Open (or create) the database file and run migrations.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        let path = path.into();
        let conn = tokio::task::spawn_blocking(move || open_file(&path))
            .await
            .map_err(|e| DatabaseError::Task(e.to_string()))??;
        Self::from_connection(conn)
    }

    /// In-memory database (tests and previews).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(open_memory_database()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        repository::ensure_statistics_row(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Insert a reviewed prescription and bump the prescription counter.
    pub async fn save(
        &self,
        patient: &PatientDetails,
        draft: &PrescriptionDraft,
    ) -> Result<i64, DatabaseError> {
        patient.validate()?;
        let patient = patient.clone();
        let draft = draft.clone();
        let id = self
            .with_conn(move |conn| {
                let now = now();
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let id = repository::insert_prescription(&tx, &patient, &draft, &now)?;
                repository::increment_total_prescriptions(&tx, &now)?;
                tx.commit()?;
                Ok(id)
            })
            .await?;
        tracing::info!(id, "Prescription saved");
        Ok(id)
    }

    /// Newest first.
    pub async fn list_recent(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PrescriptionRecord>, DatabaseError> {
        self.with_conn(move |conn| repository::list_prescriptions(conn, limit, offset))
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<PrescriptionRecord>, DatabaseError> {
        self.with_conn(move |conn| repository::get_prescription(conn, id))
            .await
    }

    /// Callers should use [`PrescriptionStore::list_recent`] for an empty query.
    pub async fn search(&self, text: &str) -> Result<Vec<PrescriptionRecord>, DatabaseError> {
        let text = text.to_string();
        self.with_conn(move |conn| repository::search_prescriptions(conn, &text))
            .await
    }

    /// Idempotent: deleting an unknown id changes nothing.
    pub async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let removed = self
            .with_conn(move |conn| {
                let now = now();
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let removed = repository::delete_prescription(&tx, id)?;
                if removed {
                    repository::decrement_total_prescriptions(&tx, &now)?;
                }
                tx.commit()?;
                Ok(removed)
            })
            .await?;
        if removed {
            tracing::info!(id, "Prescription deleted");
        } else {
            tracing::debug!(id, "Delete skipped, no such prescription");
        }
        Ok(())
    }

    pub async fn get_statistics(&self) -> Result<Statistics, DatabaseError> {
        self.with_conn(|conn| repository::get_statistics(conn)).await
    }

    pub async fn increment_voice_commands(&self) -> Result<(), DatabaseError> {
        self.with_conn(|conn| repository::increment_voice_commands(conn, &now()))
            .await
    }

    /// Reset the prescription counter to the actual row count.
    pub async fn recalculate_statistics(&self) -> Result<Statistics, DatabaseError> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            repository::recalculate_statistics(&tx, &now())?;
            let stats = repository::get_statistics(&tx)?;
            tx.commit()?;
            Ok(stats)
        })
        .await
    }

    /// Close the underlying connection. Waits for an in-flight operation
    /// to finish. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), DatabaseError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| DatabaseError::Task("connection lock poisoned".into()))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| DatabaseError::Sqlite(e))?;
            tracing::info!("Database closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().map(|g| g.is_none()).unwrap_or(true)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let shared = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = shared
                .lock()
                .map_err(|_| DatabaseError::Task("connection lock poisoned".into()))?;
            let conn = guard.as_mut().ok_or(DatabaseError::StoreClosed)?;
            f(conn)
        })
        .await
        .map_err(|e| DatabaseError::Task(e.to_string()))?
    }
}

fn open_file(path: &Path) -> Result<Connection, DatabaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    tracing::info!(path = %path.display(), "Opening prescription database");
    open_database(path)
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
