//! Recovery parsing for JSON-ish model output
//!
//! Models that were asked for a JSON object frequently wrap it in markdown
//! fences, prefix it with a language hint, or pad it with commentary. Each
//! recovery stage is small and independently testable; the composition tries
//! a strict decode of the best candidate slice and reports both the slice and
//! the decoded object so callers can degrade gracefully.

use serde_json::Value;

/// Which fenced segment to keep when a reply contains ``` fences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceSegment {
    First,
    Last,
}

/// Drop a surrounding triple-backtick fence, keeping the chosen non-empty
/// segment. Text without a leading fence passes through untouched.
pub fn strip_code_fence(text: &str, segment: FenceSegment) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    let mut segments = text.split("```").map(str::trim).filter(|s| !s.is_empty());
    let picked = match segment {
        FenceSegment::First => segments.next(),
        FenceSegment::Last => segments.last(),
    };
    picked.unwrap_or(text)
}

/// Drop a leading "json" language hint left over from a fence opener
pub fn strip_json_hint(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.get(..4) {
        Some(head) if head.eq_ignore_ascii_case("json") => trimmed[4..].trim_start(),
        _ => trimmed,
    }
}

/// Best-effort object extraction: when the text does not already start with
/// `{`, slice between the first `{` and the last `}` if both exist.
pub fn slice_object(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Run the full recovery pipeline over a raw reply.
///
/// Returns the candidate slice after fence/hint/brace recovery together with
/// the decoded object when the candidate parses as a JSON object. Callers use
/// the candidate text as degraded output when decoding fails.
pub fn recover_json(text: &str, segment: FenceSegment) -> (String, Option<Value>) {
    let stripped = strip_json_hint(strip_code_fence(text.trim(), segment));
    let candidate = slice_object(stripped);
    let decoded = serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object);
    (candidate.to_string(), decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence_first_and_last() {
        let fenced = "```json\n{\"a\": 1}\n```\ntrailing note\n```\n{\"b\": 2}\n```";
        assert_eq!(
            strip_code_fence(fenced, FenceSegment::First),
            "json\n{\"a\": 1}"
        );
        assert_eq!(strip_code_fence(fenced, FenceSegment::Last), "{\"b\": 2}");
    }

    #[test]
    fn test_strip_code_fence_passthrough_without_fence() {
        assert_eq!(
            strip_code_fence("{\"a\": 1}", FenceSegment::First),
            "{\"a\": 1}"
        );
    }

    #[test]
    fn test_strip_json_hint() {
        assert_eq!(strip_json_hint("json {\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_json_hint("JSON\n{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_json_hint("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_slice_object_extracts_between_braces() {
        assert_eq!(
            slice_object("Sure! Here you go: {\"a\": 1} hope that helps"),
            "{\"a\": 1}"
        );
        assert_eq!(slice_object("no braces at all"), "no braces at all");
        assert_eq!(slice_object("} backwards {"), "} backwards {");
    }

    #[test]
    fn test_recover_json_happy_path() {
        let (candidate, decoded) =
            recover_json("```json\n{\"word\": \"run\"}\n```", FenceSegment::First);
        assert_eq!(candidate, "{\"word\": \"run\"}");
        assert_eq!(decoded.unwrap()["word"], "run");
    }

    #[test]
    fn test_recover_json_failure_keeps_candidate() {
        let (candidate, decoded) = recover_json("not json at all", FenceSegment::First);
        assert_eq!(candidate, "not json at all");
        assert!(decoded.is_none());
    }

    #[test]
    fn test_recover_json_rejects_non_object() {
        let (_, decoded) = recover_json("[1, 2, 3]", FenceSegment::First);
        assert!(decoded.is_none());
    }
}
