use serde::Deserialize;
use serde_json::{Map, Value};

use super::GenerationError;
use crate::models::{Medication, PrescriptionDraft};

pub const DEFAULT_DIAGNOSIS: &str = "Diagnosis pending";
pub const DEFAULT_ADVICE: &str = "Follow doctor's instructions";
pub const DEFAULT_FOLLOW_UP: &str = "7 days";

const DRAFT_KEYS: &[&str] = &["diagnosis", "medications", "advice", "followUp", "follow_up"];

/// Stand-in entry used when the reply has no parseable medication list.
///
/// Not a real medicine. The review screen must show the raw reply
/// alongside any draft carrying this entry.
pub fn placeholder_medication() -> Medication {
    Medication {
        name: "Medication details in AI response".into(),
        dosage: "As prescribed".into(),
        duration: "5-7 days".into(),
        timing: "After meals".into(),
    }
}

/// Turn the model's reply into a fully populated draft.
///
/// Tries the first balanced `{...}` span as JSON, then falls back to
/// `Label: value` lines. Fields neither path finds get fixed defaults.
pub fn parse_prescription_reply(reply: &str) -> Result<PrescriptionDraft, GenerationError> {
    if reply.trim().is_empty() {
        return Err(GenerationError::GenerationFailed("empty response".into()));
    }

    if let Some(span) = find_json_object(reply) {
        match parse_draft_json(span) {
            Some(draft) => return Ok(draft),
            None => tracing::debug!(len = span.len(), "JSON span unusable, trying line fallback"),
        }
    }

    parse_labelled_lines(reply).ok_or_else(|| {
        GenerationError::GenerationFailed("response contained no recognizable prescription".into())
    })
}

/// First balanced `{...}` span, ignoring braces inside JSON string literals.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Lenient medication entry. Missing fields become empty text.
#[derive(Deserialize)]
struct RawMedication {
    name: Option<Value>,
    dosage: Option<Value>,
    duration: Option<Value>,
    timing: Option<Value>,
}

fn parse_draft_json(span: &str) -> Option<PrescriptionDraft> {
    let value: Value = serde_json::from_str(span).ok()?;
    let object = value.as_object()?;
    if !DRAFT_KEYS.iter().any(|k| object.contains_key(*k)) {
        return None;
    }

    let medications = object
        .get("medications")
        .and_then(Value::as_array)
        .map(|items| parse_medications_lenient(items))
        .unwrap_or_default();

    Some(PrescriptionDraft {
        diagnosis: text_field(object, &["diagnosis"]).unwrap_or_else(|| DEFAULT_DIAGNOSIS.into()),
        medications,
        advice: text_field(object, &["advice"]).unwrap_or_else(|| DEFAULT_ADVICE.into()),
        follow_up: text_field(object, &["followUp", "follow_up"])
            .unwrap_or_else(|| DEFAULT_FOLLOW_UP.into()),
    })
}

/// Skip entries that are not objects or carry no medicine name.
fn parse_medications_lenient(items: &[Value]) -> Vec<Medication> {
    items
        .iter()
        .filter_map(|v| serde_json::from_value::<RawMedication>(v.clone()).ok())
        .filter_map(|raw| {
            let name = raw.name.as_ref().and_then(value_text)?;
            Some(Medication {
                name,
                dosage: raw.dosage.as_ref().and_then(value_text).unwrap_or_default(),
                duration: raw.duration.as_ref().and_then(value_text).unwrap_or_default(),
                timing: raw.timing.as_ref().and_then(value_text).unwrap_or_default(),
            })
        })
        .collect()
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| object.get(*k).and_then(value_text))
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join("; "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn parse_labelled_lines(reply: &str) -> Option<PrescriptionDraft> {
    let lines: Vec<&str> = reply.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let diagnosis = labelled_value(&lines, "diagnosis");
    let advice = labelled_value(&lines, "advice");
    let follow_up = labelled_value(&lines, "follow");

    if diagnosis.is_none() && advice.is_none() && follow_up.is_none() {
        return None;
    }

    Some(PrescriptionDraft {
        diagnosis: diagnosis.unwrap_or_else(|| DEFAULT_DIAGNOSIS.into()),
        medications: vec![placeholder_medication()],
        advice: advice.unwrap_or_else(|| DEFAULT_ADVICE.into()),
        follow_up: follow_up.unwrap_or_else(|| DEFAULT_FOLLOW_UP.into()),
    })
}

/// Text after the first colon on the first line mentioning `keyword`.
fn labelled_value(lines: &[&str], keyword: &str) -> Option<String> {
    let line = lines.iter().find(|l| l.to_lowercase().contains(keyword))?;
    let (_, value) = line.split_once(':')?;
    let value = value.trim_matches(|c: char| c.is_whitespace() || c == '*');
    (!value.is_empty()).then(|| value.to_string())
}
