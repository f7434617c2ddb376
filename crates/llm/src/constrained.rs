//! Constrained generation
//!
//! Chat replies must satisfy the response rules before they reach the app
//! (and the TTS engine behind it). The generator asks the backend, validates
//! the reply, and on violation appends the failed reply plus a corrective
//! instruction to its own working copy of the conversation so the model can
//! see its mistake. After the retry budget is spent it synthesizes a
//! deterministic fallback instead of surfacing an error: only transport and
//! provider failures ever propagate out of here.

use std::sync::Arc;

use serde_json::Value;

use english_coach_core::{Completion, CompletionRequest, Message};
use english_coach_text_processing::{
    fallback, normalize_whitespace, strip_forbidden, validate, ResponseRules, Verdict,
};

use crate::{ChatBackend, LlmError};

/// How the final reply was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstrainedOutcome {
    /// A model reply passed validation (possibly after retries)
    Validated,
    /// The retry budget was exhausted and the reply was synthesized locally
    Fallback,
}

/// Result of a constrained generation run.
///
/// On [`ConstrainedOutcome::Fallback`] the metadata reflects the last failed
/// attempt — there is no successful attempt to attribute it to.
#[derive(Debug, Clone)]
pub struct ConstrainedReply {
    pub completion: Completion,
    pub outcome: ConstrainedOutcome,
}

/// Retry-until-compliant-or-fallback pipeline around a chat backend
#[derive(Clone)]
pub struct ConstrainedGenerator {
    backend: Arc<dyn ChatBackend>,
    rules: ResponseRules,
    default_temperature: f32,
}

impl ConstrainedGenerator {
    /// Create a generator enforcing the given rules
    pub fn new(backend: Arc<dyn ChatBackend>, rules: ResponseRules, default_temperature: f32) -> Self {
        Self {
            backend,
            rules,
            default_temperature,
        }
    }

    /// Rules this generator enforces
    pub fn rules(&self) -> &ResponseRules {
        &self.rules
    }

    /// Generate a reply satisfying the response rules.
    ///
    /// The caller's conversation is never mutated; correction turns are
    /// appended to a working copy only.
    pub async fn generate(&self, request: &CompletionRequest) -> Result<ConstrainedReply, LlmError> {
        let mut conversation = request.messages.clone();
        let temperature = request.temperature.unwrap_or(self.default_temperature);
        let mut last_attempt: Option<Completion> = None;

        for attempt in 0..=self.rules.retry_attempts {
            let attempt_request = CompletionRequest {
                messages: conversation.clone(),
                model: request.model.clone(),
                temperature: Some(temperature),
                max_tokens: request.max_tokens,
            };
            let completion = self.backend.complete(&attempt_request).await?;
            let normalized = normalize_whitespace(&completion.text);

            match validate(&normalized, &self.rules) {
                Verdict::Pass => {
                    let sanitized = normalize_whitespace(&strip_forbidden(&normalized));
                    return Ok(ConstrainedReply {
                        completion: Completion::new(sanitized, completion.raw),
                        outcome: ConstrainedOutcome::Validated,
                    });
                }
                Verdict::Fail(reason) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        attempts = self.rules.retry_attempts + 1,
                        %reason,
                        "LLM reply violated response rules"
                    );
                    if attempt < self.rules.retry_attempts {
                        conversation.push(Message::assistant(&normalized));
                        conversation.push(Message::user(retry_instruction(&reason, &self.rules)));
                    }
                    last_attempt = Some(Completion::new(normalized, completion.raw));
                }
            }
        }

        let last = last_attempt.unwrap_or_else(|| Completion::new("", Value::Null));
        tracing::warn!("returning fallback response after exhausting retries");
        Ok(ConstrainedReply {
            completion: Completion::new(fallback(&last.text, &self.rules), last.raw),
            outcome: ConstrainedOutcome::Fallback,
        })
    }
}

/// Corrective instruction sent after a rejected reply.
///
/// Names the violated rule and restates the full rule set, interpolating the
/// configured word bounds so the instruction can never drift from the
/// validator's configuration.
pub fn retry_instruction(reason: &str, rules: &ResponseRules) -> String {
    format!(
        "Rewrite your previous answer now so it follows every rule: respond in two or three \
         sentences, use a total of {min} to {max} English words, avoid quotation marks, emoji, \
         special symbols (# * / % -), apostrophes, and bullet lists, and keep commas natural. \
         You failed because {reason}. Produce a corrected answer immediately.",
        min = rules.word_min,
        max = rules.word_max,
    )
}
