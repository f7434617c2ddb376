//! Text shaping for LLM replies
//!
//! Everything between "the model said something" and "the API returned a
//! well-formed response" lives here:
//! - Hard constraint checks on chat replies (symbols, word counts)
//! - Deterministic fallback text when the model keeps violating them
//! - Recovery parsing of JSON-ish output from chatty models
//! - Normalizers that coerce raw replies into dictionary / grammar results
//!
//! Nothing in this crate performs I/O and nothing here returns an error to
//! callers: bad model output always degrades to a usable value.

pub mod dictionary;
pub mod fallback;
pub mod grammar;
pub mod recovery;
pub mod validator;

pub use dictionary::{normalize_dictionary, DictionaryEntry};
pub use fallback::fallback;
pub use grammar::{normalize_grammar, GrammarVerdict};
pub use recovery::{recover_json, FenceSegment};
pub use validator::{
    count_words, normalize_whitespace, strip_forbidden, validate, ResponseRules, Verdict,
    FORBIDDEN_CHARS,
};
