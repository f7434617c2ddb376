//! Hard constraints on assistant replies
//!
//! Chat replies are spoken aloud by the TTS engine and graded against
//! classroom rules, so they must stay short and free of markup. The validator
//! checks a candidate reply against the forbidden symbol set and the
//! configured word-count window; the failure reason feeds the retry
//! instruction and the logs, never the end user.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Symbols that break TTS output or violate the classroom formatting rules:
/// markdown markers, bullets, quotes, dashes, and any line breaks.
pub const FORBIDDEN_CHARS: &[char] = &[
    '#', '*', '/', '%', '-', '"', '\'', '`', '\u{2022}', '\u{25CF}', '\u{25AA}', '\u{2027}',
    '\u{00B7}', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{2013}', '\u{2014}', '\n',
    '\r', '\t',
];

pub(crate) static WORD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("valid regex"));

/// Word-count window and retry budget for constrained chat replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRules {
    /// Minimum English words required in a reply
    #[serde(default = "default_word_min")]
    pub word_min: usize,
    /// Maximum English words allowed in a reply
    #[serde(default = "default_word_max")]
    pub word_max: usize,
    /// Extra correction attempts before falling back to synthesized filler
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,
}

fn default_word_min() -> usize {
    5
}
fn default_word_max() -> usize {
    15
}
fn default_retry_attempts() -> usize {
    2
}

impl Default for ResponseRules {
    fn default() -> Self {
        Self {
            word_min: default_word_min(),
            word_max: default_word_max(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

/// Validation outcome; the failure reason is human-readable prose
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(String),
}

impl Verdict {
    /// True when the reply satisfied every rule
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Fail(reason) => Some(reason),
        }
    }
}

/// Collapse consecutive whitespace into single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove every character from the forbidden set
pub fn strip_forbidden(text: &str) -> String {
    text.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
}

/// Count English words as runs of ASCII letters. Conservative on purpose:
/// punctuation-adjacent tokens and digits never inflate the count.
pub fn count_words(text: &str) -> usize {
    WORD_PATTERN.find_iter(text).count()
}

/// Check a reply against the symbol and word-count rules.
/// Rules are applied in order; the first failure wins.
pub fn validate(content: &str, rules: &ResponseRules) -> Verdict {
    if content.trim().is_empty() {
        return Verdict::Fail("the response was empty".to_string());
    }
    if content.chars().any(|c| FORBIDDEN_CHARS.contains(&c)) {
        return Verdict::Fail("the response used forbidden symbols or line breaks".to_string());
    }
    let normalized = normalize_whitespace(content);
    let word_total = count_words(&normalized);
    if word_total < rules.word_min {
        return Verdict::Fail(format!("the response only used {word_total} words"));
    }
    if word_total > rules.word_max {
        return Verdict::Fail(format!("the response used {word_total} words"));
    }
    Verdict::Pass
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reply_fails() {
        let verdict = validate("   ", &ResponseRules::default());
        assert_eq!(verdict.reason(), Some("the response was empty"));
    }

    #[test]
    fn test_forbidden_symbols_fail() {
        let rules = ResponseRules::default();
        for sample in [
            "I am # happy to help you today",
            "Good job * keep going with practice",
            "I think you did well \u{2014} keep going",
            "Line one\nline two is not allowed here",
            "Do not use \u{201C}quotes\u{201D} in replies please",
        ] {
            let verdict = validate(sample, &rules);
            assert_eq!(
                verdict.reason(),
                Some("the response used forbidden symbols or line breaks"),
                "sample: {sample}"
            );
        }
    }

    #[test]
    fn test_too_few_words_fails() {
        let verdict = validate("Good job today", &ResponseRules::default());
        assert_eq!(verdict.reason(), Some("the response only used 3 words"));
    }

    #[test]
    fn test_too_many_words_fails() {
        let long = "word ".repeat(20);
        let verdict = validate(&long, &ResponseRules::default());
        assert_eq!(verdict.reason(), Some("the response used 20 words"));
    }

    #[test]
    fn test_within_window_passes() {
        let rules = ResponseRules::default();
        assert!(validate("You are doing very well today.", &rules).is_pass());
        assert!(validate("That is a great question, tell me more please!", &rules).is_pass());
    }

    #[test]
    fn test_word_count_ignores_digits_and_punctuation() {
        assert_eq!(count_words("I have 3 cats, really."), 4);
        assert_eq!(count_words("123 456"), 0);
    }

    #[test]
    fn test_normalize_whitespace_collapses_runs() {
        assert_eq!(normalize_whitespace("  a \t b\n\nc  "), "a b c");
    }

    #[test]
    fn test_strip_forbidden_removes_only_forbidden() {
        assert_eq!(strip_forbidden("a#b*c-d"), "abcd");
        assert_eq!(strip_forbidden("plain text stays, intact."), "plain text stays, intact.");
    }
}
