//! Tolerant parsing of remote classification replies.
//!
//! Every failure maps to "keep the local fallback", at one of two scopes:
//!
//! | input problem                                   | result                          |
//! |-------------------------------------------------|---------------------------------|
//! | surrounding ```` ``` ```` / ```` ```json ```` fences | stripped, parsing continues |
//! | prose around the array                          | text between first `[` and last `]` is tried |
//! | no parseable JSON at all                        | `ParseError::InvalidJson` (whole batch) |
//! | JSON that is not an array                       | `ParseError::NotAnArray` (whole batch) |
//! | entry that is not an object                     | entry rejected                  |
//! | missing/empty `filename`                        | entry rejected                  |
//! | missing/empty/unsafe `destination`              | entry rejected                  |
//! | missing or unknown `confidence`                 | entry rejected                  |
//! | missing `reasoning`                             | accepted with a default text    |

use crate::model::Confidence;
use serde_json::{Map, Value};
use thiserror::Error;

const DEFAULT_REASONING: &str = "Classified by remote model";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response JSON is not an array")]
    NotAnArray,
}

/// One accepted entry of a remote reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVerdict {
    pub filename: String,
    pub destination: String,
    pub confidence: Confidence,
    pub reasoning: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub verdicts: Vec<RemoteVerdict>,
    /// Entries dropped as malformed.
    pub rejected: usize,
}

pub fn parse_verdicts(content: &str) -> Result<ParsedReply, ParseError> {
    let cleaned = strip_code_fences(content);

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(first_error) => match bracketed(cleaned) {
            Some(inner) => serde_json::from_str(inner)?,
            None => return Err(ParseError::InvalidJson(first_error)),
        },
    };

    let Value::Array(entries) = value else {
        return Err(ParseError::NotAnArray);
    };

    let mut reply = ParsedReply::default();
    for entry in &entries {
        match entry.as_object().and_then(verdict_from) {
            Some(verdict) => reply.verdicts.push(verdict),
            None => reply.rejected += 1,
        }
    }
    Ok(reply)
}

/// Remove a leading ```` ``` ```` / ```` ```json ```` line and a trailing fence.
pub fn strip_code_fences(content: &str) -> &str {
    let mut text = content.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn bracketed(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

fn verdict_from(entry: &Map<String, Value>) -> Option<RemoteVerdict> {
    let filename = non_empty_str(entry.get("filename"))?;
    let destination = sanitize_destination(non_empty_str(entry.get("destination"))?)?;
    let confidence = entry
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(Confidence::parse)?;
    let reasoning = non_empty_str(entry.get("reasoning"))
        .unwrap_or(DEFAULT_REASONING)
        .to_string();

    Some(RemoteVerdict {
        filename: filename.to_string(),
        destination,
        confidence,
        reasoning,
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Normalize a destination to a relative `a/b/c` folder path. Rejects
/// anything that could escape the target root.
pub fn sanitize_destination(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    if normalized.starts_with('/') || normalized.contains(':') {
        return None;
    }

    let mut parts = Vec::new();
    for part in normalized.split('/').map(str::trim) {
        match part {
            "" | "." => continue,
            ".." => return None,
            other => parts.push(other),
        }
    }

    (!parts.is_empty()).then(|| parts.join("/"))
}
