//! Prompt construction and response parsing for book-query classification.
//!
//! The model is asked for a single JSON object with three fields:
//! `Taxonomie` (the filtered taxonomy), `Mots-clés` (keywords per book field)
//! and `Description` (a plain-language summary of the query).
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{AppError, Result};
use serde_json::Value;

const SYSTEM_PROMPT: &str = "You classify book search queries. \
Answer with a single JSON object and nothing else.";

/// Book fields the keyword extraction may target.
pub const KEYWORD_FIELDS: [&str; 8] = [
    "titre",
    "auteur",
    "resume",
    "editeur",
    "langue",
    "categorie",
    "parution",
    "pages",
];

pub fn system_prompt() -> &'static str {
    SYSTEM_PROMPT
}

/// Build the user prompt for `query` against `taxonomy`.
pub fn build_prompt(query: &str, taxonomy: &Value) -> String {
    let taxonomy_text =
        serde_json::to_string_pretty(taxonomy).unwrap_or_else(|_| taxonomy.to_string());
    let fields = KEYWORD_FIELDS
        .iter()
        .map(|f| format!("- {}", f))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyse the query below and return the relevant taxonomy categories \
together with extracted keywords, then describe the selected taxonomy in \
plain French for a non-specialist reader.\n\n\
### Taxonomy:\n{taxonomy_text}\n\n\
### Keyword fields:\n{fields}\n\n\
For each relevant field give a list of keywords including synonyms and spelling variants \
(e.g. \"policier\" -> [\"policier\", \"polar\", \"thriller\", \"enquête\"]).\n\n\
### User query:\n{query}\n\n\
### Expected format:\n\
{{\"Taxonomie\": {{...}}, \"Mots-clés\": {{\"<field>\": [\"...\"]}}, \"Description\": \"...\"}}"
    )
}

/// Parse the model's message content into a classification object.
///
/// Accepts bare JSON or JSON wrapped in a Markdown code fence.
pub fn parse_classification(content: &str) -> Result<Value> {
    let body = strip_code_fence(content.trim());
    let value: Value = serde_json::from_str(body).map_err(|e| {
        AppError::Classifier(format!("model returned invalid JSON: {}", e))
    })?;

    if !value.is_object() {
        return Err(AppError::Classifier(
            "model returned JSON that is not an object".to_string(),
        ));
    }
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") up to the first newline.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
