use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use super::extractor::extract_intake;
use super::DictationError;
use crate::models::IntakeForm;

/// Platform speech engine. `listen` starts a capture and resolves with the
/// best transcript, `None` when nothing was heard.
pub trait SpeechRecognizer: Send + Sync {
    fn listen(&self) -> impl Future<Output = Result<Option<String>, DictationError>> + Send;

    /// Ask the engine to stop capturing. Called after a timeout or cancel.
    fn stop(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// One recognizer plus the cancel signal for its in-flight turn.
///
/// At most one turn runs at a time. A turn ends with exactly one outcome;
/// once it has timed out or been cancelled, a transcript arriving later is
/// dropped.
pub struct Dictation<R: SpeechRecognizer> {
    recognizer: R,
    listening: AtomicBool,
    cancel: watch::Sender<u64>,
}

impl<R: SpeechRecognizer> Dictation<R> {
    pub fn new(recognizer: R) -> Self {
        let (cancel, _) = watch::channel(0);
        Self {
            recognizer,
            listening: AtomicBool::new(false),
            cancel,
        }
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Cancel the in-flight turn. No-op when nothing is listening.
    pub fn cancel(&self) {
        self.cancel.send_modify(|generation| *generation += 1);
    }

    /// Run one dictation turn, auto-stopping after `timeout`.
    pub async fn listen(&self, timeout: Duration) -> Result<String, DictationError> {
        // Subscribe before raising the flag so a cancel issued as soon as
        // `is_listening` reads true is always observed.
        let mut cancelled = self.cancel.subscribe();
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(DictationError::Busy);
        }
        let _turn = ListeningGuard(&self.listening);

        tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Dictation started");

        let outcome = tokio::select! {
            biased;
            _ = cancelled.changed() => Err(DictationError::Cancelled),
            _ = tokio::time::sleep(timeout) => {
                Err(DictationError::TimedOut(timeout.as_millis() as u64))
            }
            heard = self.recognizer.listen() => match heard {
                Ok(Some(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
                Ok(_) => Err(DictationError::NoSpeech),
                Err(e) => Err(e),
            },
        };

        match &outcome {
            Ok(text) => tracing::debug!(transcript_len = text.len(), "Dictation finished"),
            Err(e @ (DictationError::Cancelled | DictationError::TimedOut(_))) => {
                tracing::debug!(outcome = %e, "Dictation stopped");
                self.recognizer.stop().await;
            }
            Err(e) => tracing::warn!(error = %e, "Dictation failed"),
        }
        outcome
    }
}

struct ListeningGuard<'a>(&'a AtomicBool);

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ═══════════════════════════════════════════
// Form fields
// ═══════════════════════════════════════════

/// Intake form field a dictation turn targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    PatientName,
    PatientAge,
    Symptoms,
}

impl FormField {
    /// Auto-stop duration for a turn on this field.
    pub fn dictation_timeout(self) -> Duration {
        match self {
            Self::PatientName => Duration::from_secs(3),
            Self::PatientAge => Duration::from_secs(2),
            Self::Symptoms => Duration::from_secs(10),
        }
    }

    /// Write a transcript into the form.
    ///
    /// Name takes the text verbatim. Age takes the first number heard and
    /// leaves the field alone when there is none. Symptoms runs the full
    /// extractor, merges every recognized field, and keeps the raw
    /// transcript as symptoms when no symptom phrase was found.
    pub fn fill(self, form: &mut IntakeForm, transcript: &str) {
        let transcript = transcript.trim();
        match self {
            Self::PatientName => form.name = transcript.to_string(),
            Self::PatientAge => {
                if let Some(age) = first_number(transcript) {
                    form.age = Some(age);
                }
            }
            Self::Symptoms => {
                let intake = extract_intake(transcript);
                intake.apply_to(form);
                if intake.symptoms.is_none() {
                    form.symptoms = transcript.to_string();
                }
            }
        }
    }
}

fn first_number(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|digits| digits.parse().ok())
}

// ═══════════════════════════════════════════
// Mock recognizer
// ═══════════════════════════════════════════

/// Recognizer returning a canned outcome after an optional delay.
pub struct MockRecognizer {
    outcome: Result<Option<String>, DictationError>,
    delay: Duration,
    listens: AtomicUsize,
    stops: AtomicUsize,
}

impl MockRecognizer {
    pub fn hearing(transcript: &str) -> Self {
        Self::with_outcome(Ok(Some(transcript.to_string())))
    }

    pub fn silent() -> Self {
        Self::with_outcome(Ok(None))
    }

    pub fn failing(error: DictationError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<Option<String>, DictationError>) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            listens: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn listens(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for MockRecognizer {
    async fn listen(&self) -> Result<Option<String>, DictationError> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::Gender;

    #[tokio::test]
    async fn transcript_is_returned_trimmed() {
        let dictation = Dictation::new(MockRecognizer::hearing("  fever and cough "));
        let text = dictation.listen(Duration::from_secs(1)).await.unwrap();
        assert_eq!(text, "fever and cough");
        assert!(!dictation.is_listening());
        assert_eq!(dictation.recognizer().stops(), 0);
    }

    #[tokio::test]
    async fn silence_is_no_speech() {
        let dictation = Dictation::new(MockRecognizer::silent());
        assert_eq!(
            dictation.listen(Duration::from_secs(1)).await.unwrap_err(),
            DictationError::NoSpeech
        );

        let dictation = Dictation::new(MockRecognizer::hearing("   "));
        assert_eq!(
            dictation.listen(Duration::from_secs(1)).await.unwrap_err(),
            DictationError::NoSpeech
        );
    }

    #[tokio::test]
    async fn recognizer_error_passes_through() {
        let dictation = Dictation::new(MockRecognizer::failing(DictationError::Recognizer(
            "microphone unavailable".into(),
        )));
        let err = dictation.listen(Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, DictationError::Recognizer("microphone unavailable".into()));
        assert!(!dictation.is_listening());
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_after_timeout_is_dropped() {
        let dictation =
            Dictation::new(MockRecognizer::hearing("too late").with_delay(Duration::from_secs(10)));
        let err = dictation.listen(Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err, DictationError::TimedOut(5000));
        assert_eq!(dictation.recognizer().stops(), 1);
        assert!(!dictation.is_listening());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ends_the_turn() {
        let dictation = Arc::new(Dictation::new(
            MockRecognizer::hearing("never delivered").with_delay(Duration::from_secs(60)),
        ));
        let turn = {
            let dictation = Arc::clone(&dictation);
            tokio::spawn(async move { dictation.listen(Duration::from_secs(120)).await })
        };
        while !dictation.is_listening() {
            tokio::task::yield_now().await;
        }
        dictation.cancel();

        assert_eq!(turn.await.unwrap().unwrap_err(), DictationError::Cancelled);
        assert_eq!(dictation.recognizer().stops(), 1);
        assert!(!dictation.is_listening());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_seen_as_soon_as_listening() {
        for _ in 0..50 {
            let dictation = Arc::new(Dictation::new(
                MockRecognizer::hearing("never delivered").with_delay(Duration::from_secs(60)),
            ));
            let turn = {
                let dictation = Arc::clone(&dictation);
                tokio::spawn(async move { dictation.listen(Duration::from_secs(120)).await })
            };
            while !dictation.is_listening() {
                std::hint::spin_loop();
            }
            dictation.cancel();

            let outcome = tokio::time::timeout(Duration::from_secs(5), turn).await;
            assert_eq!(outcome.unwrap().unwrap().unwrap_err(), DictationError::Cancelled);
        }
    }

    #[tokio::test]
    async fn cancel_without_turn_is_harmless() {
        let dictation = Dictation::new(MockRecognizer::hearing("hello"));
        dictation.cancel();
        dictation.cancel();
        // A cancel issued before the turn started does not end it.
        assert_eq!(dictation.listen(Duration::from_secs(1)).await.unwrap(), "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn second_turn_while_listening_is_busy() {
        let dictation = Arc::new(Dictation::new(
            MockRecognizer::hearing("first").with_delay(Duration::from_secs(1)),
        ));
        let first = {
            let dictation = Arc::clone(&dictation);
            tokio::spawn(async move { dictation.listen(Duration::from_secs(5)).await })
        };
        while !dictation.is_listening() {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            dictation.listen(Duration::from_secs(5)).await.unwrap_err(),
            DictationError::Busy
        );
        assert_eq!(first.await.unwrap().unwrap(), "first");
        assert_eq!(dictation.recognizer().listens(), 1);
    }

    #[test]
    fn field_timeouts() {
        assert_eq!(FormField::PatientName.dictation_timeout(), Duration::from_secs(3));
        assert_eq!(FormField::PatientAge.dictation_timeout(), Duration::from_secs(2));
        assert_eq!(FormField::Symptoms.dictation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn name_field_takes_transcript_verbatim() {
        let mut form = IntakeForm::default();
        FormField::PatientName.fill(&mut form, " Ravi Kumar ");
        assert_eq!(form.name, "Ravi Kumar");
    }

    #[test]
    fn age_field_takes_first_number() {
        let mut form = IntakeForm::default();
        FormField::PatientAge.fill(&mut form, "42 years");
        assert_eq!(form.age, Some(42));

        FormField::PatientAge.fill(&mut form, "forty");
        assert_eq!(form.age, Some(42));
    }

    #[test]
    fn symptoms_field_merges_extracted_intake() {
        let mut form = IntakeForm {
            name: "Old Name".into(),
            age: Some(10),
            gender: Some(Gender::Other),
            symptoms: String::new(),
        };
        FormField::Symptoms.fill(
            &mut form,
            "patient John Smith age 45 male complaining of fever and cough",
        );
        assert_eq!(form.name, "John Smith");
        assert_eq!(form.age, Some(45));
        assert_eq!(form.gender, Some(Gender::Male));
        assert_eq!(form.symptoms, "fever and cough");
    }

    #[test]
    fn symptoms_field_falls_back_to_raw_text() {
        let mut form = IntakeForm {
            name: "Mary".into(),
            ..Default::default()
        };
        FormField::Symptoms.fill(&mut form, "dry cough at night");
        assert_eq!(form.name, "Mary");
        assert_eq!(form.symptoms, "dry cough at night");
    }
}
