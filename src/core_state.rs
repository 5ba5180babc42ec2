//! Composition root for the clinical core.
//!
//! `CoreState` owns the prescription store and the generator and is the
//! only surface the application shell talks to. It is opened once at
//! startup and closed by `shutdown()` or, failing that, on drop.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{self, GenerationSettings};
use crate::db::{DatabaseError, PrescriptionStore};
use crate::generation::{ChatTransport, GenerationError, HttpChatTransport, PrescriptionGenerator};
use crate::models::{
    IntakeForm, PatientDetails, PatientIntake, PrescriptionDraft, PrescriptionRecord, Statistics,
};
use crate::voice::{extract_intake, Dictation, DictationError, FormField, SpeechRecognizer};

/// Page size used when a blank search falls back to the recent list.
pub const RECENT_PAGE_SIZE: u32 = 50;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState<T: ChatTransport = HttpChatTransport> {
    store: PrescriptionStore,
    generator: PrescriptionGenerator<T>,
}

impl CoreState<HttpChatTransport> {
    /// Open the database at `path` and build an HTTPS generator.
    pub async fn open(
        path: impl Into<PathBuf>,
        settings: GenerationSettings,
    ) -> Result<Self, CoreError> {
        let generator = PrescriptionGenerator::from_settings(settings)?;
        let store = PrescriptionStore::open(path).await?;
        tracing::info!("{} core v{} ready", config::APP_NAME, config::APP_VERSION);
        Ok(Self::new(store, generator))
    }

    /// Open with the default database path and environment settings.
    pub async fn open_default() -> Result<Self, CoreError> {
        Self::open(config::database_path(), GenerationSettings::from_env()).await
    }
}

impl<T: ChatTransport> CoreState<T> {
    pub fn new(store: PrescriptionStore, generator: PrescriptionGenerator<T>) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &PrescriptionStore {
        &self.store
    }

    pub fn generator(&self) -> &PrescriptionGenerator<T> {
        &self.generator
    }

    // ── Credential ──────────────────────────────────────────

    pub fn set_api_key(&self, api_key: &str) {
        self.generator.set_api_key(api_key);
    }

    pub fn clear_api_key(&self) {
        self.generator.clear_api_key();
    }

    pub fn has_api_key(&self) -> bool {
        self.generator.has_api_key()
    }

    // ── Prescriptions ───────────────────────────────────────

    pub async fn generate_prescription(
        &self,
        patient: &PatientDetails,
    ) -> Result<PrescriptionDraft, CoreError> {
        Ok(self.generator.generate(patient).await?)
    }

    pub async fn save_prescription(
        &self,
        patient: &PatientDetails,
        draft: &PrescriptionDraft,
    ) -> Result<i64, CoreError> {
        Ok(self.store.save(patient, draft).await?)
    }

    pub async fn list_recent(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<PrescriptionRecord>, CoreError> {
        Ok(self.store.list_recent(limit, offset).await?)
    }

    pub async fn get_prescription(&self, id: i64) -> Result<Option<PrescriptionRecord>, CoreError> {
        Ok(self.store.get_by_id(id).await?)
    }

    /// Substring search; a blank query returns the most recent page instead.
    pub async fn search_prescriptions(
        &self,
        query: &str,
    ) -> Result<Vec<PrescriptionRecord>, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_recent(RECENT_PAGE_SIZE, 0).await;
        }
        Ok(self.store.search(query).await?)
    }

    pub async fn delete_prescription(&self, id: i64) -> Result<(), CoreError> {
        Ok(self.store.delete(id).await?)
    }

    pub async fn statistics(&self) -> Result<Statistics, CoreError> {
        Ok(self.store.get_statistics().await?)
    }

    pub async fn recalculate_statistics(&self) -> Result<Statistics, CoreError> {
        Ok(self.store.recalculate_statistics().await?)
    }

    // ── Voice ───────────────────────────────────────────────

    /// One dictation turn parsed into intake fields.
    ///
    /// The voice counter moves only when a transcript was obtained.
    pub async fn dictate_intake<R: SpeechRecognizer>(
        &self,
        dictation: &Dictation<R>,
        timeout: Duration,
    ) -> Result<PatientIntake, CoreError> {
        let transcript = self.dictate(dictation, timeout).await?;
        Ok(extract_intake(&transcript))
    }

    /// [`Self::dictate_intake`] with the app's default auto-stop duration.
    pub async fn dictate_intake_default<R: SpeechRecognizer>(
        &self,
        dictation: &Dictation<R>,
    ) -> Result<PatientIntake, CoreError> {
        self.dictate_intake(dictation, config::DEFAULT_DICTATION_TIMEOUT).await
    }

    /// One dictation turn written into a single form field, using the
    /// field's own auto-stop duration.
    pub async fn dictate_field<R: SpeechRecognizer>(
        &self,
        dictation: &Dictation<R>,
        field: FormField,
        form: &mut IntakeForm,
    ) -> Result<(), CoreError> {
        let transcript = self.dictate(dictation, field.dictation_timeout()).await?;
        field.fill(form, &transcript);
        Ok(())
    }

    async fn dictate<R: SpeechRecognizer>(
        &self,
        dictation: &Dictation<R>,
        timeout: Duration,
    ) -> Result<String, CoreError> {
        let transcript = dictation.listen(timeout).await?;
        self.store.increment_voice_commands().await?;
        Ok(transcript)
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Close the store. Later operations fail with a storage error.
    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.store.close()?;
        Ok(())
    }
}

impl<T: ChatTransport> Drop for CoreState<T> {
    fn drop(&mut self) {
        if let Err(e) = self.store.close() {
            tracing::warn!(error = %e, "Failed to close database on drop");
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] DatabaseError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Dictation(#[from] DictationError),
}
