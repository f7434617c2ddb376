//! Grammar check normalizer
//!
//! Coerces the grading model's reply into a structured verdict. Decode
//! failures degrade to the stripped reply as feedback; this component never
//! errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::recovery::{recover_json, FenceSegment};

/// Feedback when the model returned nothing at all
const NO_FEEDBACK: &str = "No grammar feedback returned. Please try again.";

/// Feedback when the model returned a verdict without prose
const DEFAULT_FEEDBACK: &str = "Grammar check completed.";

/// Structured grammar feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarVerdict {
    /// Whether the submitted text was judged grammatically correct
    pub is_correct: bool,
    /// Explanation of the problem, or confirmation of correctness
    pub feedback: String,
    /// Suggested rewrite, when one was offered
    pub suggestion: Option<String>,
}

/// Normalize a raw LLM reply into a grammar verdict
pub fn normalize_grammar(payload: &str) -> GrammarVerdict {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return GrammarVerdict {
            is_correct: false,
            feedback: NO_FEEDBACK.to_string(),
            suggestion: None,
        };
    }

    let (candidate, decoded) = recover_json(trimmed, FenceSegment::First);
    let Some(data) = decoded else {
        return GrammarVerdict {
            is_correct: false,
            feedback: candidate,
            suggestion: None,
        };
    };

    let is_correct = data
        .get("is_correct")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let feedback = data
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FEEDBACK)
        .to_string();
    let suggestion = data
        .get("suggestion")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    GrammarVerdict {
        is_correct,
        feedback,
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_verdict() {
        let payload = "{\"is_correct\": false, \"feedback\": \"subject-verb disagreement\", \
                       \"suggestion\": \"He goes home.\"}";
        let verdict = normalize_grammar(payload);
        assert!(!verdict.is_correct);
        assert_eq!(verdict.feedback, "subject-verb disagreement");
        assert_eq!(verdict.suggestion.as_deref(), Some("He goes home."));
    }

    #[test]
    fn test_fenced_verdict() {
        let payload = "```json\n{\"is_correct\": true, \"feedback\": \"Looks good.\"}\n```";
        let verdict = normalize_grammar(payload);
        assert!(verdict.is_correct);
        assert_eq!(verdict.feedback, "Looks good.");
        assert_eq!(verdict.suggestion, None);
    }

    #[test]
    fn test_empty_reply() {
        let verdict = normalize_grammar("  ");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.feedback, NO_FEEDBACK);
    }

    #[test]
    fn test_unstructured_reply_becomes_feedback() {
        let verdict = normalize_grammar("Your sentence looks fine to me.");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.feedback, "Your sentence looks fine to me.");
        assert_eq!(verdict.suggestion, None);
    }

    #[test]
    fn test_blank_fields_default() {
        let verdict = normalize_grammar("{\"is_correct\": true, \"feedback\": \"\", \
                                         \"suggestion\": \"\"}");
        assert!(verdict.is_correct);
        assert_eq!(verdict.feedback, DEFAULT_FEEDBACK);
        assert_eq!(verdict.suggestion, None);
    }

    #[test]
    fn test_missing_verdict_defaults_incorrect() {
        let verdict = normalize_grammar("{\"feedback\": \"checked\"}");
        assert!(!verdict.is_correct);
    }
}
