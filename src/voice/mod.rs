//! Voice intake: one dictation turn over a speech-recognizer black box, and
//! the rule-based extractor that turns the transcript into intake fields.

pub mod dictation;
pub mod extractor;

pub use dictation::*;
pub use extractor::*;

use thiserror::Error;

/// Outcome of a dictation turn that produced no transcript.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DictationError {
    #[error("Dictation timed out after {0} ms")]
    TimedOut(u64),

    #[error("Dictation cancelled")]
    Cancelled,

    #[error("No speech recognized")]
    NoSpeech,

    #[error("Speech recognizer error: {0}")]
    Recognizer(String),

    #[error("A dictation turn is already in progress")]
    Busy,
}
