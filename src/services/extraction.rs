//! Best-effort recovery of structured output from free model text.
//!
//! The model is told to answer in JSON but routinely wraps it in prose,
//! markdown fences or leaked ChatML turns. Everything here is pure so the
//! heuristics can be tested, and replaced once the upstream supports a strict
//! structured-output mode.

use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Shown when nothing usable survives extraction.
pub const APOLOGY_TEXT: &str = "I'm having trouble processing that request. Please try again.";

/// At most this many reply suggestions are returned.
pub const MAX_SUGGESTIONS: usize = 3;

/// Leaked `<|im_start|>role ... <|im_end|>` turns.
static ROLE_MARKER_SPAN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?s)<\|im_start\|>.*?<\|im_end\|>")
        .expect("ROLE_MARKER_SPAN_RE is a valid static regex pattern")
});

/// Bracket pair bounding the JSON value to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiters {
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
}

impl Delimiters {
    fn pair(self) -> (char, char) {
        match self {
            Self::Object => ('{', '}'),
            Self::Array => ('[', ']'),
        }
    }
}

/// Span from the first opening delimiter to the last closing one.
///
/// Greedy on purpose: nested values and trailing chatter after the closing
/// bracket both end up inside or outside the span correctly. Returns `None`
/// if no closing delimiter follows the first opening one.
pub fn json_span(text: &str, delimiters: Delimiters) -> Option<&str> {
    let (open, close) = delimiters.pair();
    let start = text.find(open)?;
    let end = text.rfind(close)?;

    (end > start).then(|| &text[start..=end])
}

/// Drops a leading "```json" and a trailing "```", then trims.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Removes every leaked ChatML turn from the text.
pub fn strip_role_markers(text: &str) -> String {
    ROLE_MARKER_SPAN_RE.replace_all(text, "").into_owned()
}

/// True for bodies that look like an HTML error page (proxy or tunnel
/// errors) rather than a message from the inference service.
pub fn looks_like_html(body: &str) -> bool {
    body.trim_start().starts_with('<') || body.to_ascii_lowercase().contains("<!doctype")
}

/// Result of reading an assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    /// User-facing text. Never empty.
    pub response: String,
    /// Parsed reply object, when the model followed the schema.
    pub structured: Option<Value>,
}

/// Reads the assistant's answer out of raw model text.
///
/// Prefers the `content` of a parsed `{ action, content, structured }`
/// object; falls back to the whole object when only `action` and
/// `structured` are present, and to cleaned-up plain text when nothing
/// parses. The apology text replaces an empty result.
pub fn extract_assistant_reply(raw: &str) -> AssistantReply {
    let candidate = json_span(raw, Delimiters::Object).unwrap_or(raw);
    let candidate = strip_code_fences(candidate);

    let (response, structured) = match serde_json::from_str::<Value>(candidate) {
        Ok(parsed) => {
            if let Some(content) = parsed.get("content").and_then(truthy_text) {
                (content, Some(parsed))
            } else if is_truthy(parsed.get("action")) && is_truthy(parsed.get("structured")) {
                (parsed.to_string(), Some(parsed))
            } else {
                debug!("Parsed reply carries neither content nor action");
                (String::new(), None)
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse AI JSON response");
            debug!(raw = %raw, "Unparsed AI response");
            let cleaned = strip_role_markers(raw);
            (strip_code_fences(&cleaned).to_string(), None)
        }
    };

    let response = if response.is_empty() {
        APOLOGY_TEXT.to_string()
    } else {
        response
    };

    AssistantReply {
        response,
        structured,
    }
}

/// Reads up to [`MAX_SUGGESTIONS`] reply suggestions out of raw model text.
///
/// Looks for a JSON array of strings first; otherwise takes the first
/// non-empty lines verbatim. May return an empty list.
pub fn extract_suggestions(raw: &str) -> Vec<String> {
    let parsed = json_span(raw, Delimiters::Array)
        .map(|span| serde_json::from_str::<Vec<Value>>(span));

    match parsed {
        Some(Ok(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.trim().is_empty())
            .take(MAX_SUGGESTIONS)
            .collect(),
        other => {
            if let Some(Err(e)) = other {
                warn!(error = %e, "Failed to parse smart reply JSON");
            }
            raw.lines()
                .filter(|line| !line.trim().is_empty())
                .take(MAX_SUGGESTIONS)
                .map(str::to_string)
                .collect()
        }
    }
}

/// Missing, null, false, zero and "" all count as absent.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn truthy_text(value: &Value) -> Option<String> {
    if !is_truthy(Some(value)) {
        return None;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
