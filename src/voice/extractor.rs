use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Gender, PatientIntake};

// Each rule scans the whole utterance on its own. Rules never see each
// other's captures, so overlapping matches are expected.

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\b(?:patient|name(?:\s+is)?)\s+([a-zA-Z\s]+?)(?:\s+age|\s+\d|,|$)")
});

static AGE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\baged?\s+(\d+)|(\d+)\s+years?"));

static MALE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\b(?:male|man|boy)\b"));

static FEMALE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\b(?:female|woman|girl)\b"));

static SYMPTOMS: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)(?:complaining\s+of|symptoms?|suffering\s+from)\s+(.+)")
});

static SYMPTOMS_AFTER_INFO: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:\d+\s+years?|\bmale|\bfemale)\s+(.+)"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid intake regex pattern")
}

/// One independent extraction rule. `present` reports whether the rule's
/// field was filled.
struct ExtractionRule {
    field: &'static str,
    apply: fn(&str, &mut PatientIntake),
    present: fn(&PatientIntake) -> bool,
}

/// Applied in order; each rule writes only its own field.
const RULES: &[ExtractionRule] = &[
    ExtractionRule {
        field: "name",
        apply: apply_name,
        present: |i| i.name.is_some(),
    },
    ExtractionRule {
        field: "age",
        apply: apply_age,
        present: |i| i.age.is_some(),
    },
    ExtractionRule {
        field: "gender",
        apply: apply_gender,
        present: |i| i.gender.is_some(),
    },
    ExtractionRule {
        field: "symptoms",
        apply: apply_symptoms,
        present: |i| i.symptoms.is_some(),
    },
];

fn apply_name(text: &str, out: &mut PatientIntake) {
    out.name = extract_name(text);
}

fn apply_age(text: &str, out: &mut PatientIntake) {
    out.age = extract_age(text);
}

fn apply_gender(text: &str, out: &mut PatientIntake) {
    out.gender = extract_gender(text);
}

fn apply_symptoms(text: &str, out: &mut PatientIntake) {
    out.symptoms = extract_symptoms(text);
}

/// Pull whatever intake fields one dictated utterance contains.
///
/// Pure and deterministic. Unrecognized fields are `None`; this never fails.
pub fn extract_intake(utterance: &str) -> PatientIntake {
    let mut intake = PatientIntake::default();
    for rule in RULES {
        (rule.apply)(utterance, &mut intake);
    }
    tracing::debug!(
        utterance_len = utterance.len(),
        fields = ?RULES
            .iter()
            .filter(|r| (r.present)(&intake))
            .map(|r| r.field)
            .collect::<Vec<_>>(),
        "Intake extracted"
    );
    intake
}

/// Words after "patient", "name" or "name is", up to "age", a digit, a
/// comma or the end of input.
pub fn extract_name(text: &str) -> Option<String> {
    NAME.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// "age N" / "aged N", else "N year(s)". Leftmost match wins.
pub fn extract_age(text: &str) -> Option<u32> {
    let caps = AGE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whole-word gender keywords. The male check runs first, so an utterance
/// naming both resolves to `Male`.
pub fn extract_gender(text: &str) -> Option<Gender> {
    if MALE.is_match(text) {
        Some(Gender::Male)
    } else if FEMALE.is_match(text) {
        Some(Gender::Female)
    } else {
        None
    }
}

/// Text after an explicit symptom phrase, else text after "N years" or a
/// gender keyword.
pub fn extract_symptoms(text: &str) -> Option<String> {
    let caps = SYMPTOMS
        .captures(text)
        .or_else(|| SYMPTOMS_AFTER_INFO.captures(text))?;
    caps.get(1)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_utterance() {
        let intake = extract_intake("patient John Smith age 45 male complaining of fever and cough");
        assert_eq!(
            intake,
            PatientIntake {
                name: Some("John Smith".into()),
                age: Some(45),
                gender: Some(Gender::Male),
                symptoms: Some("fever and cough".into()),
            }
        );
    }

    #[test]
    fn no_name_with_years_and_suffering() {
        let intake = extract_intake("45 years female suffering from headache");
        assert_eq!(
            intake,
            PatientIntake {
                name: None,
                age: Some(45),
                gender: Some(Gender::Female),
                symptoms: Some("headache".into()),
            }
        );
    }

    #[test]
    fn name_and_age_only() {
        let intake = extract_intake("patient Mary age 30");
        assert_eq!(intake.name.as_deref(), Some("Mary"));
        assert_eq!(intake.age, Some(30));
        assert_eq!(intake.gender, None);
        assert_eq!(intake.symptoms, None);
    }

    #[test]
    fn name_is_phrase() {
        assert_eq!(extract_name("my name is Ravi Kumar, 34 years").as_deref(), Some("Ravi Kumar"));
        assert_eq!(extract_name("Name Priya 28").as_deref(), Some("Priya"));
    }

    #[test]
    fn name_runs_to_end_of_input() {
        assert_eq!(extract_name("patient Anil Mehta").as_deref(), Some("Anil Mehta"));
    }

    #[test]
    fn no_name_keyword() {
        assert_eq!(extract_name("fever since two days"), None);
        assert_eq!(extract_name("outpatient review"), None);
    }

    #[test]
    fn age_alternatives() {
        assert_eq!(extract_age("aged 70 with chest pain"), Some(70));
        assert_eq!(extract_age("AGE 12"), Some(12));
        assert_eq!(extract_age("a 1 year old boy"), Some(1));
        assert_eq!(extract_age("no number here"), None);
    }

    #[test]
    fn leftmost_age_wins() {
        assert_eq!(extract_age("8 years of cough, age 60"), Some(8));
    }

    #[test]
    fn gender_is_whole_word() {
        assert_eq!(extract_gender("a young boy"), Some(Gender::Male));
        assert_eq!(extract_gender("the WOMAN reports"), Some(Gender::Female));
        assert_eq!(extract_gender("female patient"), Some(Gender::Female));
        assert_eq!(extract_gender("manager with backache"), None);
    }

    #[test]
    fn male_wins_when_both_present() {
        assert_eq!(extract_gender("female patient, husband is a man"), Some(Gender::Male));
    }

    #[test]
    fn symptoms_fallback_after_gender() {
        assert_eq!(
            extract_symptoms("patient Ravi male fever for three days").as_deref(),
            Some("fever for three days")
        );
    }

    #[test]
    fn symptom_keyword_preferred_over_fallback() {
        assert_eq!(
            extract_symptoms("40 years male symptoms rash on arms").as_deref(),
            Some("rash on arms")
        );
    }

    #[test]
    fn rules_are_independent() {
        // The name capture stops at the digit while the symptom fallback
        // still sees the whole utterance.
        let intake = extract_intake("patient Leela 60 years female dizziness");
        assert_eq!(intake.name.as_deref(), Some("Leela"));
        assert_eq!(intake.age, Some(60));
        assert_eq!(intake.symptoms.as_deref(), Some("female dizziness"));
    }

    #[test]
    fn empty_utterance_extracts_nothing() {
        assert!(extract_intake("").is_empty());
        assert!(extract_intake("   ").is_empty());
    }

    #[test]
    fn each_rule_reports_only_its_own_field() {
        for rule in RULES {
            let mut intake = PatientIntake::default();
            (rule.apply)("patient John Smith age 45 male complaining of fever", &mut intake);
            assert!((rule.present)(&intake), "{} not reported", rule.field);
            let others = RULES.iter().filter(|r| r.field != rule.field);
            for other in others {
                assert!(!(other.present)(&intake), "{} set by {}", other.field, rule.field);
            }
        }
        let empty = PatientIntake::default();
        assert!(RULES.iter().all(|r| !(r.present)(&empty)));
    }

    #[test]
    fn deterministic() {
        let text = "patient John Smith age 45 male complaining of fever and cough";
        assert_eq!(extract_intake(text), extract_intake(text));
    }
}
