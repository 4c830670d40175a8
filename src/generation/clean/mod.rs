//! Post-processing for raw model output.
//!
//! Models often wrap JSON in markdown fences or surround it with prose.
//! [`clean`] recovers structured data when it can and otherwise falls back
//! to readable plain text.


use std::sync::LazyLock;

use fancy_regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Result of cleaning a raw model response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// The response contained valid JSON
    Structured(Value),
    /// No JSON could be recovered; markdown markup has been stripped
    PlainText(String),
}

impl ParsedResponse {
    #[inline]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Pretty-printed JSON or the plain text as-is
    #[inline]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::PlainText(text) => text.clone(),
        }
    }
}

static JSON_ARRAY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));
static JSON_OBJECT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

static MARKDOWN_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?m)^ {0,3}#{1,6}[ \t]+").expect("valid regex"), ""),
        (Regex::new(r"(\*\*|__)(.+?)\1").expect("valid regex"), "$2"),
        (
            Regex::new(r"(?<![\w*])\*(?![\s*])(.+?)(?<![\s*])\*(?![\w*])").expect("valid regex"),
            "$1",
        ),
        (Regex::new(r"(?m)^([ \t]*)[*+][ \t]+").expect("valid regex"), "${1}- "),
        (Regex::new(r"`+").expect("valid regex"), ""),
    ]
});

/// Clean a raw model response into structured JSON or plain text
#[inline]
pub fn clean(raw: &str) -> ParsedResponse {
    let unfenced = strip_code_fences(raw);

    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return ParsedResponse::Structured(value);
    }

    for regex in [&*JSON_ARRAY_REGEX, &*JSON_OBJECT_REGEX] {
        let Ok(Some(found)) = regex.find(unfenced) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(found.as_str()) {
            debug!("Recovered JSON embedded in surrounding text");
            return ParsedResponse::Structured(value);
        }
    }

    debug!("Response is not JSON, falling back to plain text");
    ParsedResponse::PlainText(strip_markdown(unfenced))
}

/// Remove a surrounding markdown code fence and its language tag
#[inline]
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        Some((tag, body)) if is_language_tag(tag) => body,
        _ => rest,
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn is_language_tag(tag: &str) -> bool {
    tag.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Strip common markdown markup, keeping the text content
#[inline]
pub fn strip_markdown(text: &str) -> String {
    MARKDOWN_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, (regex, replacement)| {
            regex.replace_all(&acc, *replacement).to_string()
        })
        .trim()
        .to_string()
}
