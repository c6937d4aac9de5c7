//! Prompt construction and defensive parsing of model output.
//!
//! The model is asked for a JSON array of `{course_id, rationale, confidence}`
//! objects, but what comes back is free text: it may be wrapped in prose or
//! code fences, carry trailing commas, or mix valid entries with broken ones.
//! [`parse_recommendations`] is a pure function over that text so it can be
//! tested against recorded outputs without any network call.
//!
//! Entry rules:
//! - `course_id` must name one of the candidates; unknown ids are dropped and
//!   repeated ids keep only their first valid entry.
//! - `rationale` (or `reason`) must be a non-blank string.
//! - `confidence` is coerced into `[0, 1]`; anything non-numeric becomes
//!   [`NEUTRAL_CONFIDENCE`].
//! - At most `top_k` entries are returned, in model order. Nothing is padded.

use crate::dtos::CandidateCourse;
use crate::models::Recommendation;
use crate::services::providers::{ChatMessage, GenerationParams};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Confidence used when the model gives none or something non-numeric.
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Longest extra-field value shown to the model per candidate.
const MAX_FIELD_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are an academic advisor. You explain briefly and concretely why \
courses match what a student is looking for. You answer with JSON only.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("model returned no text")]
    Empty,

    #[error("no JSON array found in model output")]
    NoJsonPayload,
}

/// Validated entries plus how many were discarded along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecommendations {
    pub recommendations: Vec<Recommendation>,
    pub dropped: usize,
}

/// Build the conversation asking for `top_k` rationales over `candidates`.
pub fn build_prompt(query: &str, candidates: &[CandidateCourse], top_k: usize) -> Vec<ChatMessage> {
    let listing = candidates
        .iter()
        .map(describe_candidate)
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        "Student query: \"{query}\"\n\n\
         Candidate courses:\n{listing}\n\n\
         Pick the {top_k} courses from the list that best match the query, best first. \
         Respond with ONLY a JSON array of exactly {top_k} objects shaped like\n\
         {{\"course_id\": \"<id from the list>\", \"rationale\": \"<one or two sentences>\", \"confidence\": <number from 0 to 1>}}\n\
         Use only course_id values that appear in the list. No text before or after the array."
    );

    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)]
}

/// Token budget for a reply carrying `top_k` entries.
pub fn generation_params(temperature: f32, top_k: usize) -> GenerationParams {
    GenerationParams {
        temperature: Some(temperature),
        max_tokens: Some((200 + 120 * top_k as u32).min(4000)),
    }
}

fn describe_candidate(candidate: &CandidateCourse) -> String {
    let mut details = Vec::new();
    collect_details(&candidate.extra, &mut details);

    if details.is_empty() {
        format!("- {}: {}", candidate.course_id, candidate.title)
    } else {
        format!(
            "- {}: {} ({})",
            candidate.course_id,
            candidate.title,
            details.join(", ")
        )
    }
}

/// Scalar extras as `key: value`; one level of nested `metadata` is flattened.
fn collect_details(fields: &Map<String, Value>, out: &mut Vec<String>) {
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::String(s) if s.trim().is_empty() => {}
            Value::String(s) => out.push(format!("{}: {}", key, truncate_chars(s.trim(), MAX_FIELD_CHARS))),
            Value::Number(n) => out.push(format!("{}: {}", key, n)),
            Value::Bool(b) => out.push(format!("{}: {}", key, b)),
            Value::Object(inner) if key == "metadata" => collect_details(inner, out),
            Value::Object(_) | Value::Array(_) => {}
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Parse raw model text into at most `top_k` validated recommendations.
///
/// Errors only when no JSON payload can be located at all; individual bad
/// entries are dropped and counted instead.
pub fn parse_recommendations(
    raw: &str,
    candidates: &[CandidateCourse],
    top_k: usize,
) -> Result<ParsedRecommendations, ParseError> {
    let entries = extract_entries(raw)?;

    let known: HashSet<&str> = candidates.iter().map(|c| c.course_id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut recommendations = Vec::new();
    let mut dropped = 0;

    for entry in entries {
        if recommendations.len() == top_k {
            break;
        }
        match validate_entry(entry, &known) {
            Some(rec) if seen.insert(rec.course_id.clone()) => recommendations.push(rec),
            _ => dropped += 1,
        }
    }

    Ok(ParsedRecommendations {
        recommendations,
        dropped,
    })
}

fn validate_entry(entry: Value, known: &HashSet<&str>) -> Option<Recommendation> {
    let Value::Object(fields) = entry else {
        return None;
    };

    let course_id = match fields.get("course_id")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if !known.contains(course_id.as_str()) {
        return None;
    }

    let rationale = fields
        .get("rationale")
        .or_else(|| fields.get("reason"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    Some(Recommendation {
        course_id,
        rationale,
        confidence: coerce_confidence(fields.get("confidence")),
    })
}

/// Numbers clamp into `[0, 1]`; numeric strings are parsed first (`"85%"`
/// reads as 0.85); anything else is neutral.
pub fn coerce_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f64>().ok().map(|p| p / 100.0),
                None => s.parse::<f64>().ok(),
            }
        }
        _ => None,
    };

    match parsed {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => NEUTRAL_CONFIDENCE,
    }
}

/// Locate the entry list inside free text.
///
/// Tried in order: the first decodable array holding an object (or object
/// with a `recommendations` array); the same after removing trailing commas;
/// every standalone object that carries a `course_id`.
fn extract_entries(raw: &str) -> Result<Vec<Value>, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(entries) = first_array(raw) {
        return Ok(entries);
    }

    let cleaned = strip_trailing_commas(raw);
    if let Some(entries) = first_array(&cleaned) {
        return Ok(entries);
    }

    let salvaged = salvage_objects(&cleaned);
    if !salvaged.is_empty() {
        return Ok(salvaged);
    }

    Err(ParseError::NoJsonPayload)
}

/// Decode one JSON value starting at byte `start`, ignoring whatever follows.
/// Returns the value and the number of bytes it spans.
fn decode_at(text: &str, start: usize) -> Option<(Value, usize)> {
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Some((value, stream.byte_offset())),
        _ => None,
    }
}

/// First array that holds at least one object, or the `recommendations`
/// array of an object. Objects decoded along the way are skipped whole so
/// their inner arrays are never taken for the payload.
fn first_array(text: &str) -> Option<Vec<Value>> {
    let mut idx = 0;

    while let Some(offset) = text[idx..].find(&['[', '{'][..]) {
        let start = idx + offset;
        match decode_at(text, start) {
            Some((Value::Array(items), _)) if items.iter().any(Value::is_object) => {
                return Some(items);
            }
            Some((Value::Object(mut obj), consumed)) => {
                if let Some(Value::Array(items)) = obj.remove("recommendations") {
                    return Some(items);
                }
                idx = start + consumed.max(1);
                continue;
            }
            _ => {}
        }
        idx = start + 1;
    }

    None
}

fn salvage_objects(text: &str) -> Vec<Value> {
    let mut found = Vec::new();
    let mut idx = 0;

    while let Some(offset) = text[idx..].find('{') {
        let start = idx + offset;
        match decode_at(text, start) {
            Some((value @ Value::Object(_), consumed)) if value.get("course_id").is_some() => {
                found.push(value);
                idx = start + consumed.max(1);
            }
            _ => idx = start + 1,
        }
    }

    found
}

/// Remove commas that directly precede `]` or `}` outside string literals.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some(']') | Some('}')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }

    out
}
