use std::sync::RwLock;

use super::parser::parse_prescription_reply;
use super::prompt::{build_prescription_prompt, PRESCRIPTION_SYSTEM_PROMPT};
use super::transport::{ChatCompletionRequest, ChatMessage, ChatTransport, HttpChatTransport};
use super::GenerationError;
use crate::config::GenerationSettings;
use crate::models::{PatientDetails, PrescriptionDraft};

/// Drafts prescriptions through a chat-completion transport.
///
/// The credential is injected by the shell and may be replaced or cleared
/// at any time. One `generate` call is one request; nothing is retried.
pub struct PrescriptionGenerator<T: ChatTransport = HttpChatTransport> {
    transport: T,
    settings: GenerationSettings,
    api_key: RwLock<Option<String>>,
}

impl PrescriptionGenerator<HttpChatTransport> {
    /// Generator backed by the HTTPS transport at `settings.endpoint`.
    pub fn from_settings(settings: GenerationSettings) -> Result<Self, GenerationError> {
        let transport = HttpChatTransport::new(&settings.endpoint, settings.timeout)?;
        Ok(Self::new(transport, settings))
    }
}

impl<T: ChatTransport> PrescriptionGenerator<T> {
    pub fn new(transport: T, settings: GenerationSettings) -> Self {
        Self {
            transport,
            settings,
            api_key: RwLock::new(None),
        }
    }

    pub fn with_api_key(self, api_key: &str) -> Self {
        self.set_api_key(api_key);
        self
    }

    /// Store a credential. Blank input clears it.
    pub fn set_api_key(&self, api_key: &str) {
        let trimmed = api_key.trim();
        let value = (!trimmed.is_empty()).then(|| trimmed.to_string());
        *self.api_key.write().unwrap_or_else(|e| e.into_inner()) = value;
    }

    pub fn clear_api_key(&self) {
        *self.api_key.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Draft a prescription for one patient.
    ///
    /// Fails with `AuthNotConfigured` before touching the transport when no
    /// credential is set. The whole exchange is bounded by
    /// `settings.timeout`.
    pub async fn generate(
        &self,
        patient: &PatientDetails,
    ) -> Result<PrescriptionDraft, GenerationError> {
        let api_key = self
            .api_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(GenerationError::AuthNotConfigured)?;

        let request = self.build_request(patient);
        let start = std::time::Instant::now();

        let reply = tokio::time::timeout(
            self.settings.timeout,
            self.transport.complete(&api_key, &request),
        )
        .await
        .map_err(|_| GenerationError::RequestTimeout(self.settings.timeout.as_secs()))?
        .inspect_err(|e| tracing::warn!(error = %e, "Prescription generation failed"))?;

        let draft = parse_prescription_reply(&reply)?;

        tracing::info!(
            model = %self.settings.model,
            reply_len = reply.len(),
            medications = draft.medications.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Prescription draft generated"
        );
        Ok(draft)
    }

    fn build_request(&self, patient: &PatientDetails) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(PRESCRIPTION_SYSTEM_PROMPT),
                ChatMessage::user(build_prescription_prompt(patient)),
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}
