use crate::security::risk::{self, RiskLevel};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Response contains no JSON object")]
    NoJsonObject,

    #[error("Invalid JSON in response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("Command doesn't look like a git command: {0}")]
    NotAGitCommand(String),
}

/// Wire-level response schema as produced by the backend
///
/// Keys mirror the prompt preamble exactly; unknown extra keys are ignored.
#[derive(Debug, Deserialize)]
struct WireResponse {
    reply: String,
    command: String,
    explanation: String,
    #[serde(rename = "updatedContext", default)]
    updated_context: Option<Map<String, Value>>,
    #[serde(default)]
    is_destructive: bool,
    #[serde(default)]
    alternatives: Option<Vec<String>>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.8
}

/// Provider-agnostic normalized response record
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    pub reply: String,
    pub command: String,
    pub explanation: String,
    /// Predicted post-execution context; advisory only, never used for
    /// control decisions
    pub updated_context: Option<Map<String, Value>>,
    pub is_destructive: bool,
    pub risk: RiskLevel,
    pub alternatives: Vec<String>,
    pub confidence: f64,
}

/// Parse raw backend text into a normalized response
///
/// Backends are not perfectly obedient to the schema instruction, so known
/// wrapper noise (markdown fences, prose around the object) is stripped
/// before parsing rather than rejected. After the structural parse the
/// destructive flag is re-derived through the risk classifier and OR-ed with
/// whatever the backend claimed.
pub fn parse(raw: &str) -> Result<NormalizedResponse, ParseError> {
    let stripped = strip_wrappers(raw);
    let json_text = extract_json_object(stripped).ok_or(ParseError::NoJsonObject)?;

    let wire: WireResponse = serde_json::from_str(json_text)?;

    let reply = wire.reply.trim().to_string();
    if reply.is_empty() {
        return Err(ParseError::EmptyField("reply"));
    }

    let explanation = wire.explanation.trim().to_string();
    if explanation.is_empty() {
        return Err(ParseError::EmptyField("explanation"));
    }

    let command = wire.command.trim().to_string();
    if command.is_empty() {
        return Err(ParseError::EmptyField("command"));
    }
    if command != "git" && !command.starts_with("git ") {
        return Err(ParseError::NotAGitCommand(command));
    }

    let risk = risk::classify(&command);
    let classified_destructive = risk != RiskLevel::Low;
    if classified_destructive && !wire.is_destructive {
        warn!(command = %command, "backend under-reported a destructive command");
    }

    Ok(NormalizedResponse {
        reply,
        explanation,
        updated_context: wire.updated_context,
        is_destructive: wire.is_destructive || classified_destructive,
        risk,
        alternatives: wire.alternatives.unwrap_or_default(),
        confidence: wire.confidence.clamp(0.0, 1.0),
        command,
    })
}

/// Strip markdown code fences the prompt explicitly forbade but backends
/// emit anyway
fn strip_wrappers(raw: &str) -> &str {
    let mut text = raw.trim();

    if text.starts_with("```") {
        if let Some(newline) = text.find('\n') {
            text = &text[newline + 1..];
        }
        if let Some(closing) = text.rfind("```") {
            text = &text[..closing];
        }
        text = text.trim();
    }

    text
}

/// Slice from the first '{' to the last '}' so incidental prose around the
/// object does not break the parse
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
