use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// One prescribed medicine. Order inside a prescription is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub duration: String,
    pub timing: String,
}

/// AI-proposed prescription content awaiting review.
///
/// Field names on the wire match the JSON shape requested from the model
/// (`followUp` is camel-cased there).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionDraft {
    pub diagnosis: String,
    pub medications: Vec<Medication>,
    pub advice: String,
    #[serde(rename = "followUp")]
    pub follow_up: String,
}

impl PrescriptionDraft {
    /// Plain-text rendering handed to text-to-speech and share sheets.
    pub fn to_spoken_text(&self) -> String {
        let mut out = format!("Diagnosis: {}.", self.diagnosis);
        if !self.medications.is_empty() {
            out.push_str(" Medications:");
            for (i, med) in self.medications.iter().enumerate() {
                out.push_str(&format!(
                    " {}. {}, {}, for {}, {}.",
                    i + 1,
                    med.name,
                    med.dosage,
                    med.duration,
                    med.timing
                ));
            }
        }
        out.push_str(&format!(" Advice: {}.", self.advice));
        out.push_str(&format!(" Follow up: {}.", self.follow_up));
        out
    }
}

/// Structured patient data required to generate or save a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub symptoms: String,
}

impl PatientDetails {
    /// Required-field check shared by the store and the intake form.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.name.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("patient name is required".into()));
        }
        if self.age == 0 {
            return Err(DatabaseError::ConstraintViolation("patient age must be positive".into()));
        }
        if self.gender.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("patient gender is required".into()));
        }
        if self.symptoms.trim().is_empty() {
            return Err(DatabaseError::ConstraintViolation("symptoms are required".into()));
        }
        Ok(())
    }
}

/// A saved prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub id: i64,
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_gender: String,
    pub symptoms: String,
    pub diagnosis: String,
    pub medications: Vec<Medication>,
    pub advice: String,
    pub follow_up: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PrescriptionRecord {
    pub fn patient(&self) -> PatientDetails {
        PatientDetails {
            name: self.patient_name.clone(),
            age: self.patient_age,
            gender: self.patient_gender.clone(),
            symptoms: self.symptoms.clone(),
        }
    }

    pub fn draft(&self) -> PrescriptionDraft {
        PrescriptionDraft {
            diagnosis: self.diagnosis.clone(),
            medications: self.medications.clone(),
            advice: self.advice.clone(),
            follow_up: self.follow_up.clone(),
        }
    }
}
