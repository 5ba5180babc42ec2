//! Remote prescription drafting: prompt rendering, the chat-completion
//! transport seam, reply parsing and the generator that ties them together.

pub mod generator;
pub mod parser;
pub mod prompt;
pub mod transport;

pub use generator::*;
pub use parser::*;
pub use prompt::*;
pub use transport::*;

use thiserror::Error;

/// Failures surfaced by [`PrescriptionGenerator::generate`]. Exactly one is
/// raised per failed call and none is retried by the core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("API key not configured")]
    AuthNotConfigured,

    #[error("API key was rejected by the generation service")]
    InvalidCredential,

    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    #[error("Request timed out after {0}s")]
    RequestTimeout(u64),

    #[error("Failed to generate prescription: {0}")]
    GenerationFailed(String),
}
