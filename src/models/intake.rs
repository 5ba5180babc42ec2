use serde::{Deserialize, Serialize};

use super::enums::Gender;
use super::prescription::PatientDetails;
use crate::db::DatabaseError;

/// Fields recognised in a single dictated utterance. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIntake {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub symptoms: Option<String>,
}

impl PatientIntake {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.gender.is_none() && self.symptoms.is_none()
    }

    /// Merge into an in-progress form. A present value overwrites its own
    /// field; absent values leave the form untouched.
    pub fn apply_to(&self, form: &mut IntakeForm) {
        if let Some(name) = &self.name {
            form.name = name.clone();
        }
        if let Some(age) = self.age {
            form.age = Some(age);
        }
        if let Some(gender) = self.gender {
            form.gender = Some(gender);
        }
        if let Some(symptoms) = &self.symptoms {
            form.symptoms = symptoms.clone();
        }
    }
}

/// The editable intake form owned by the shell while a prescription is drafted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeForm {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub symptoms: String,
}

impl IntakeForm {
    /// Validate a completed form into the details accepted by generation and storage.
    pub fn to_patient_details(&self) -> Result<PatientDetails, DatabaseError> {
        let age = self
            .age
            .ok_or_else(|| DatabaseError::ConstraintViolation("patient age is required".into()))?;
        let gender = self
            .gender
            .ok_or_else(|| DatabaseError::ConstraintViolation("patient gender is required".into()))?;
        let details = PatientDetails {
            name: self.name.trim().to_string(),
            age,
            gender: gender.as_str().to_string(),
            symptoms: self.symptoms.trim().to_string(),
        };
        details.validate()?;
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> IntakeForm {
        IntakeForm {
            name: "Asha Rao".into(),
            age: Some(52),
            gender: Some(Gender::Female),
            symptoms: "joint pain".into(),
        }
    }

    #[test]
    fn present_fields_overwrite_form() {
        let mut form = filled_form();
        let intake = PatientIntake {
            name: Some("John Smith".into()),
            age: Some(45),
            gender: Some(Gender::Male),
            symptoms: Some("fever".into()),
        };
        intake.apply_to(&mut form);
        assert_eq!(form.name, "John Smith");
        assert_eq!(form.age, Some(45));
        assert_eq!(form.gender, Some(Gender::Male));
        assert_eq!(form.symptoms, "fever");
    }

    #[test]
    fn absent_fields_leave_form_untouched() {
        let mut form = filled_form();
        let intake = PatientIntake {
            age: Some(53),
            ..Default::default()
        };
        intake.apply_to(&mut form);
        assert_eq!(form.name, "Asha Rao");
        assert_eq!(form.age, Some(53));
        assert_eq!(form.gender, Some(Gender::Female));
        assert_eq!(form.symptoms, "joint pain");
    }

    #[test]
    fn empty_intake_is_a_no_op() {
        let mut form = filled_form();
        let intake = PatientIntake::default();
        assert!(intake.is_empty());
        intake.apply_to(&mut form);
        assert_eq!(form, filled_form());
    }

    #[test]
    fn complete_form_converts_to_details() {
        let details = filled_form().to_patient_details().unwrap();
        assert_eq!(details.gender, "Female");
        assert_eq!(details.age, 52);
    }

    #[test]
    fn incomplete_form_is_rejected() {
        let mut form = filled_form();
        form.gender = None;
        assert!(form.to_patient_details().is_err());

        let mut form = filled_form();
        form.symptoms = "  ".into();
        assert!(form.to_patient_details().is_err());
    }
}
