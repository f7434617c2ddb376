//! Lookup endpoints: translation, grammar check, dictionary
//!
//! Each builds a task-specific prompt, calls the LLM with temperature pinned
//! to 0 for determinism, and normalizes the raw reply into a structured
//! result. Grammar and dictionary degrade to placeholder responses when the
//! LLM is unreachable instead of failing the request.

use axum::extract::{Json, State};
use serde::{Deserialize, Serialize};
use serde_json::json;

use english_coach_core::{CompletionRequest, Message, Role};
use english_coach_text_processing::{normalize_dictionary, normalize_grammar};

use crate::state::AppState;
use crate::ServerError;

/// Target language used when a translation request does not name one
const DEFAULT_TARGET_LANGUAGE: &str = "zh-TW";

/// Definition shown when the dictionary model is unreachable
const DEFINITION_UNAVAILABLE: &str = "No definition available, please try again later.";

/// Feedback shown when the grammar model is unreachable
const GRAMMAR_UNAVAILABLE: &str = "Grammar check is unavailable right now, please try again later.";

/// Interpolate the target language into the prompt template, tolerating
/// templates without the placeholder by using them unformatted
fn render_translation_prompt(template: &str, target_language: &str) -> String {
    if template.contains("{target_language}") {
        template.replace("{target_language}", target_language)
    } else {
        template.to_string()
    }
}

/// Request override > task-specific model > server default
fn choose_model(request_model: Option<String>, task_model: &Option<String>, default: &Option<String>) -> Option<String> {
    request_model.or_else(|| task_model.clone()).or_else(|| default.clone())
}

// ── Translation ─────────────────────────────────────────────────────────────

/// Translation request
#[derive(Debug, Deserialize)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,
    /// BCP-47 tag for the output language; defaults to Traditional Chinese
    #[serde(default)]
    pub target_language: Option<String>,
    /// Optional model override
    #[serde(default)]
    pub model: Option<String>,
}

/// Translation response
#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub translated_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Translate text into a target language using the configured LLM
pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslationRequest>,
) -> Result<Json<TranslationResponse>, ServerError> {
    let settings = &state.settings.llm;
    let target_language = request
        .target_language
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_TARGET_LANGUAGE);

    let prompt = render_translation_prompt(&settings.translation.prompt_template, target_language);
    let completion_request = CompletionRequest {
        messages: vec![Message::system(prompt), Message::user(&request.text)],
        model: choose_model(
            request.model,
            &settings.translation.model,
            &settings.default_model,
        ),
        temperature: Some(0.0),
        max_tokens: None,
    };

    let completion = state.llm.complete(&completion_request).await?;
    Ok(Json(TranslationResponse {
        translated_text: completion.text.trim().to_string(),
        model: completion.model().map(String::from),
    }))
}

// ── Grammar check ───────────────────────────────────────────────────────────

/// Grammar check request
#[derive(Debug, Deserialize)]
pub struct GrammarCheckRequest {
    /// Text to evaluate for grammatical correctness
    pub text: String,
    /// Prior conversation turns giving the sentence its context
    #[serde(default)]
    pub context: Vec<Message>,
    /// Optional model override
    #[serde(default)]
    pub model: Option<String>,
}

/// Grammar check response
#[derive(Debug, Serialize)]
pub struct GrammarCheckResponse {
    pub is_correct: bool,
    pub feedback: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Fold the last few turns of prior conversation into one labeled block
fn context_block(context: &[Message], turns: usize) -> Option<String> {
    if context.is_empty() || turns == 0 {
        return None;
    }
    let skip = context.len().saturating_sub(turns);
    let lines: Vec<String> = context[skip..]
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            format!("{role}: {}", message.content)
        })
        .collect();
    Some(format!("Conversation so far:\n{}", lines.join("\n")))
}

/// Analyse user text and report grammar issues using the configured LLM
pub async fn grammar_check(
    State(state): State<AppState>,
    Json(request): Json<GrammarCheckRequest>,
) -> Result<Json<GrammarCheckResponse>, ServerError> {
    let settings = &state.settings.llm;

    let mut messages = vec![Message::system(&settings.grammar.prompt)];
    if let Some(block) = context_block(&request.context, settings.grammar.context_turns) {
        messages.push(Message::user(block));
    }
    messages.push(Message::user(&request.text));

    let completion_request = CompletionRequest {
        messages,
        model: choose_model(request.model, &settings.grammar.model, &settings.default_model),
        temperature: Some(0.0),
        max_tokens: None,
    };

    let completion = match state.llm.complete(&completion_request).await {
        Ok(completion) => completion,
        Err(e) => {
            tracing::warn!("grammar check failed: {e}");
            return Ok(Json(GrammarCheckResponse {
                is_correct: false,
                feedback: GRAMMAR_UNAVAILABLE.to_string(),
                suggestion: None,
                model: None,
            }));
        }
    };

    let verdict = normalize_grammar(&completion.text);
    Ok(Json(GrammarCheckResponse {
        is_correct: verdict.is_correct,
        feedback: verdict.feedback,
        suggestion: verdict.suggestion,
        model: completion.model().map(String::from),
    }))
}

// ── Dictionary lookup ───────────────────────────────────────────────────────

/// Dictionary lookup request
#[derive(Debug, Deserialize)]
pub struct DictionaryRequest {
    /// Target word chosen by the learner
    pub word: String,
    /// Sentence the word appeared in, when available
    #[serde(default)]
    pub sentence: Option<String>,
    /// Optional model override
    #[serde(default)]
    pub model: Option<String>,
}

/// Dictionary lookup response
#[derive(Debug, Serialize)]
pub struct DictionaryResponse {
    pub headword: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    pub definition: String,
    pub examples: Vec<String>,
    pub phonetics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Look up a word with the configured LLM and return a structured entry
pub async fn dictionary_lookup(
    State(state): State<AppState>,
    Json(request): Json<DictionaryRequest>,
) -> Result<Json<DictionaryResponse>, ServerError> {
    let settings = &state.settings.llm;

    let mut payload = json!({ "word": &request.word });
    if let Some(sentence) = request
        .sentence
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        payload["sentence"] = json!(sentence);
    }

    let completion_request = CompletionRequest {
        messages: vec![
            Message::system(&settings.dictionary.prompt),
            Message::user(payload.to_string()),
        ],
        model: choose_model(
            request.model,
            &settings.dictionary.model,
            &settings.default_model,
        ),
        temperature: Some(0.0),
        max_tokens: None,
    };

    let completion = match state.llm.complete(&completion_request).await {
        Ok(completion) => completion,
        Err(e) => {
            tracing::warn!("dictionary lookup failed: {e}");
            return Ok(Json(DictionaryResponse {
                headword: request.word,
                part_of_speech: None,
                definition: DEFINITION_UNAVAILABLE.to_string(),
                examples: Vec::new(),
                phonetics: Vec::new(),
                notes: None,
                model: None,
            }));
        }
    };

    let entry = normalize_dictionary(&completion.text, &request.word);
    Ok(Json(DictionaryResponse {
        headword: entry.headword,
        part_of_speech: entry.part_of_speech,
        definition: entry.definition,
        examples: entry.examples,
        phonetics: entry.phonetics,
        notes: entry.notes,
        model: completion.model().map(String::from),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_router;
    use crate::testing::{stub_state, StubBackend};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_translate_returns_trimmed_text() {
        let (state, _dir) = stub_state(StubBackend::with_replies(&["  \u{4F60}\u{597D}  "]));
        let response = create_router(state)
            .oneshot(post("/translate", json!({"text": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["translated_text"], "\u{4F60}\u{597D}");
        assert_eq!(body["model"], "stub-model");
    }

    #[tokio::test]
    async fn test_translate_propagates_upstream_failure() {
        let (state, _dir) = stub_state(StubBackend::failing());
        let response = create_router(state)
            .oneshot(post("/translate", json!({"text": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_grammar_normalizes_structured_reply() {
        let (state, _dir) = stub_state(StubBackend::with_replies(&[
            "{\"is_correct\": false, \"feedback\": \"subject-verb disagreement\", \
             \"suggestion\": \"He goes home.\"}",
        ]));
        let response = create_router(state)
            .oneshot(post("/grammar", json!({"text": "He go home."})))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["is_correct"], false);
        assert_eq!(body["feedback"], "subject-verb disagreement");
        assert_eq!(body["suggestion"], "He goes home.");
        assert_eq!(body["model"], "stub-model");
    }

    #[tokio::test]
    async fn test_grammar_degrades_when_llm_unreachable() {
        let (state, _dir) = stub_state(StubBackend::failing());
        let response = create_router(state)
            .oneshot(post("/grammar", json!({"text": "He go home."})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["is_correct"], false);
        assert!(body.get("model").is_none());
    }

    #[tokio::test]
    async fn test_dictionary_normalizes_fenced_reply() {
        let (state, _dir) = stub_state(StubBackend::with_replies(&[
            "```json\n{\"headword\":\"run\",\"part_of_speech\":\"verb\",\
             \"definition\":\"move fast\",\"examples\":[\"I run daily\"]}\n```",
        ]));
        let response = create_router(state)
            .oneshot(post("/dictionary", json!({"word": "run"})))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["headword"], "run");
        assert_eq!(body["part_of_speech"], "verb");
        assert_eq!(body["definition"], "move fast");
        assert_eq!(body["examples"], json!(["I run daily"]));
    }

    #[tokio::test]
    async fn test_dictionary_degrades_when_llm_unreachable() {
        let (state, _dir) = stub_state(StubBackend::failing());
        let response = create_router(state)
            .oneshot(post("/dictionary", json!({"word": "run"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["headword"], "run");
        assert_eq!(body["definition"], DEFINITION_UNAVAILABLE);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_render_translation_prompt() {
        assert_eq!(
            render_translation_prompt("Translate into {target_language}.", "fr"),
            "Translate into fr."
        );
        assert_eq!(
            render_translation_prompt("Translate this.", "fr"),
            "Translate this."
        );
    }

    #[test]
    fn test_context_block_keeps_last_turns() {
        let context = vec![
            Message::assistant("How are you?"),
            Message::user("I fine."),
            Message::assistant("Tell me more."),
        ];
        let block = context_block(&context, 2).unwrap();
        assert!(!block.contains("How are you?"));
        assert!(block.contains("user: I fine."));
        assert!(block.contains("assistant: Tell me more."));
        assert!(context_block(&[], 2).is_none());
    }
}
