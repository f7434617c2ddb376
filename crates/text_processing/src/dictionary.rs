//! Dictionary lookup normalizer
//!
//! Coerces a raw LLM reply into a fixed-shape dictionary entry. The model is
//! prompted for a JSON object but routinely wraps it in fences or prose, so
//! every field is extracted defensively and a decode failure degrades to the
//! stripped text rather than an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::recovery::{recover_json, FenceSegment};

/// Placeholder definition when the model returned nothing usable
pub const NO_DEFINITION: &str = "No definition";

/// Structured dictionary lookup result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Normalized dictionary headword
    pub headword: String,
    /// Part-of-speech label, when one was extracted
    pub part_of_speech: Option<String>,
    /// Learner-facing definition
    pub definition: String,
    /// Example sentences demonstrating usage (at most three)
    pub examples: Vec<String>,
    /// Phonetic transcriptions, when provided
    pub phonetics: Vec<String>,
    /// Free-form learning notes
    pub notes: Option<String>,
}

impl DictionaryEntry {
    /// Minimal entry carrying only the looked-up word and a definition text
    fn minimal(headword: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            headword: headword.into(),
            part_of_speech: None,
            definition: definition.into(),
            examples: Vec::new(),
            phonetics: Vec::new(),
            notes: None,
        }
    }
}

/// Normalize a raw LLM reply into a dictionary entry.
///
/// `fallback_word` fills the headword whenever the reply does not provide
/// one. This never fails; malformed output degrades to a minimal entry.
pub fn normalize_dictionary(payload: &str, fallback_word: &str) -> DictionaryEntry {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return DictionaryEntry::minimal(fallback_word, NO_DEFINITION);
    }

    // Chatty models sometimes emit several fenced blocks; the final one is
    // the corrected object.
    let (candidate, decoded) = recover_json(trimmed, FenceSegment::Last);
    let Some(data) = decoded else {
        return DictionaryEntry::minimal(fallback_word, candidate);
    };

    let headword =
        scalar_field(&data, "headword").unwrap_or_else(|| fallback_word.to_string());
    let part_of_speech = match data.get("part_of_speech") {
        Some(Value::Array(items)) => items.first().and_then(scalar_value),
        Some(value) => scalar_value(value),
        None => None,
    };
    let definition =
        scalar_field(&data, "definition").unwrap_or_else(|| NO_DEFINITION.to_string());
    let mut examples = list_field(&data, "examples");
    examples.truncate(3);
    let phonetics = list_field(&data, "phonetics");
    let notes = scalar_field(&data, "notes");

    DictionaryEntry {
        headword,
        part_of_speech,
        definition,
        examples,
        phonetics,
        notes,
    }
}

/// Trimmed string form of a scalar field, when present and non-null
fn scalar_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(scalar_value)
}

fn scalar_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A list field accepts an actual list (elements coerced to trimmed strings,
/// empties dropped) or a bare string wrapped as a single-element list.
fn list_field(data: &Value, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_value).collect(),
        Some(value) => scalar_value(value).into_iter().collect(),
        None => Vec::new(),
    }
}
