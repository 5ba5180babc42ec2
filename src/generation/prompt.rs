use crate::models::PatientDetails;

pub const PRESCRIPTION_SYSTEM_PROMPT: &str = "You are an expert medical assistant helping \
doctors draft accurate prescriptions. Give detailed, medically sound recommendations and \
answer only in the JSON format you are asked for.";

/// Build the user instruction for one patient intake.
pub fn build_prescription_prompt(patient: &PatientDetails) -> String {
    format!(
        r#"Draft a medical prescription for the following patient.

Patient Information:
- Name: {name}
- Age: {age} years
- Gender: {gender}
- Symptoms: {symptoms}

Include:
1. Diagnosis (most probable condition given the symptoms)
2. Medications (name, dosage, duration, timing)
3. General advice (lifestyle, diet, precautions)
4. Follow-up recommendation

Reply with JSON in exactly this structure:
{{
  "diagnosis": "condition name",
  "medications": [
    {{
      "name": "medicine name",
      "dosage": "dosage amount",
      "duration": "duration",
      "timing": "when to take"
    }}
  ],
  "advice": "general advice",
  "followUp": "follow-up recommendation"
}}"#,
        name = patient.name.trim(),
        age = patient.age,
        gender = patient.gender.trim(),
        symptoms = patient.symptoms.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> PatientDetails {
        PatientDetails {
            name: " John Smith ".into(),
            age: 45,
            gender: "Male".into(),
            symptoms: "fever and cough".into(),
        }
    }

    #[test]
    fn prompt_embeds_patient_intake() {
        let prompt = build_prescription_prompt(&patient());
        assert!(prompt.contains("- Name: John Smith\n"));
        assert!(prompt.contains("- Age: 45 years"));
        assert!(prompt.contains("- Gender: Male"));
        assert!(prompt.contains("- Symptoms: fever and cough"));
    }

    #[test]
    fn prompt_specifies_reply_shape() {
        let prompt = build_prescription_prompt(&patient());
        for key in ["\"diagnosis\"", "\"medications\"", "\"dosage\"", "\"timing\"", "\"advice\"", "\"followUp\""] {
            assert!(prompt.contains(key), "missing {key}");
        }
        // Braces are literal, not format leftovers.
        assert!(prompt.contains("{\n  \"diagnosis\""));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn system_prompt_requests_json_only() {
        assert!(PRESCRIPTION_SYSTEM_PROMPT.contains("JSON"));
    }
}
