//! AI rewrite suggestion requests and responses

use crate::model::Confidence;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Longest text sent for a full-text rewrite, in characters
pub const FULL_TEXT_MAX_CHARS: usize = 8000;

/// Body of `POST /api/alternate-text-suggestion`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternateTextRequest {
    pub source_id: String,
    pub content_type: String,
    pub sentence: String,
    pub text: String,
    pub keywords: Vec<String>,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_prompt: Option<String>,
}

impl AlternateTextRequest {
    /// Build a request for one selected passage; without a custom prompt a
    /// default one naming the first keyword is used
    pub fn new(
        source_id: &str,
        content_type: &str,
        sentence: &str,
        keywords: Vec<String>,
        metadata: Map<String, Value>,
        custom_prompt: Option<&str>,
    ) -> Self {
        let prompt = match custom_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(prompt) => prompt.to_string(),
            None => {
                let keyword = keywords.first().map(String::as_str).unwrap_or("this text");
                format!(
                    "Please provide 3-5 alternative ways to express \"{}\" that avoid using terms \
                     related to {}. Keep the educational context and meaning intact. Be creative \
                     and offer substantively different alternatives.",
                    sentence, keyword
                )
            }
        };

        Self {
            source_id: non_empty_or(source_id, "highlighted-text"),
            content_type: non_empty_or(content_type, "text"),
            sentence: sentence.to_string(),
            text: sentence.to_string(),
            keywords,
            metadata,
            req_prompt: Some(prompt),
        }
    }
}

/// Body of `POST /api/full-sentence-suggestion`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullTextRequest {
    pub original_text: String,
    pub keywords: Vec<String>,
    pub source_id: String,
    pub content_type: String,
    pub metadata: Map<String, Value>,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl FullTextRequest {
    /// Build a whole-text rewrite request; a custom prompt is wrapped in the
    /// improver template, otherwise a default prompt embeds the text
    pub fn new(
        source_id: &str,
        content_type: &str,
        original_text: &str,
        keywords: Vec<String>,
        metadata: Map<String, Value>,
        custom_prompt: Option<&str>,
    ) -> Self {
        let text = truncate_text(original_text, FULL_TEXT_MAX_CHARS);
        let keywords_str = if keywords.is_empty() {
            "specified keywords".to_string()
        } else {
            keywords.join(", ")
        };

        let prompt = match custom_prompt.map(str::trim).filter(|p| !p.is_empty()) {
            Some(task) => improver_prompt(task, &keywords_str),
            None => format!(
                "Please rewrite the following educational text to avoid using terms related to: \
                 {}. Preserve the educational meaning and context, but replace or rephrase \
                 sections containing these keywords. Provide 3 alternative versions of the full \
                 text, each with different approaches to rewording.\n\nOriginal text: \"{}\"",
                keywords_str, text
            ),
        };

        Self {
            original_text: text,
            keywords,
            source_id: non_empty_or(source_id, "full-text"),
            content_type: non_empty_or(content_type, "text"),
            metadata,
            mode: "full_text".to_string(),
            prompt: Some(prompt),
        }
    }
}

/// User task wrapped with the standing rewrite requirements; the backend
/// substitutes `{text_to_process}`
pub fn improver_prompt(task: &str, keywords: &str) -> String {
    format!(
        "You are an educational content improver.\n\n\
         YOUR TASK:\n{}\n\n\
         ADDITIONAL REQUIREMENTS:\n\
         - The text should avoid using terminology related to: {}\n\
         - Maintain the same educational meaning and context\n\
         - Keep the same tone and level as the original\n\n\
         Format your response as a JSON array with 3 alternative versions, like this:\n\
         [\n  \"First complete alternative text...\",\n  \"Second complete alternative text...\",\n  \
         \"Third complete alternative text...\"\n]\n\n\
         Original text:\n{{text_to_process}}",
        task, keywords
    )
}

fn non_empty_or(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Alternatives arrive as strings or as objects carrying the text under
/// `text`, `suggestion` or `value`
pub fn normalize_alternative(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(map) => ["text", "suggestion", "value"]
            .iter()
            .find_map(|key| match map.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(Value::String(_)) => None,
                Some(other) => Some(other.to_string()),
            })
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

fn deserialize_alternatives<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .iter()
        .map(normalize_alternative)
        .collect())
}

/// One flagged phrase with its rewrites
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlternativeSuggestion {
    #[serde(default, alias = "problematicPhrase")]
    pub problematic_phrase: String,
    #[serde(default, deserialize_with = "deserialize_alternatives")]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_matched: Option<String>,
    #[serde(default)]
    pub confidence: Confidence,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlternateTextResponse {
    #[serde(default)]
    pub alternative_suggestions: Vec<AlternativeSuggestion>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FullTextResponse {
    #[serde(default, deserialize_with = "deserialize_alternatives")]
    pub alternatives: Vec<String>,
}
