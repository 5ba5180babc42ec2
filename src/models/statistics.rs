use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The single running statistics row shown on the home dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_prescriptions: u64,
    pub total_patients: u64,
    pub voice_commands: u64,
    pub updated_at: NaiveDateTime,
}
