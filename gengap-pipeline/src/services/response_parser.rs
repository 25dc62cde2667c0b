//! Parse cascade for batch-classification responses
//!
//! The text-classification backend is asked for a JSON object mapping
//! names to gender labels, but its output is frequently malformed:
//! wrapped in markdown fences, carrying trailing commas, or using the
//! wrong quote style. Each strategy here is a pure function tried in
//! order; only names that survive no strategy are lost.
//!
//! Order: strict parse, fenced-block extraction, syntax repair with
//! re-parse, then pattern extraction of individual pairs.

use gengap_common::db::Gender;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

lazy_static! {
    /// `, }` / `, ]` trailing separators
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();
    /// Single-quoted keys: `'name':`
    static ref SINGLE_QUOTED_KEY_RE: Regex = Regex::new(r"'([^']*)'(\s*:)").unwrap();
    /// Single-quoted values: `: 'label'`
    static ref SINGLE_QUOTED_VALUE_RE: Regex = Regex::new(r"(:\s*)'([^']*)'").unwrap();
    /// Last-resort `"name": "label"` pair extraction
    static ref PAIR_RE: Regex =
        Regex::new(r#""([^"]+)"\s*:\s*"(male|female|unknown)""#).unwrap();
}

/// Why a single parse strategy produced nothing
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON is not an object of string labels")]
    NotAMapping,

    #[error("no fenced block present")]
    NoFencedBlock,

    #[error("no name/label pairs found")]
    NoPairs,
}

type Strategy = std::result::Result<HashMap<String, Gender>, ParseFailure>;

/// Strategy (a): strict JSON object parse.
pub fn parse_strict(text: &str) -> Strategy {
    let value: serde_json::Value = serde_json::from_str(text.trim())?;
    let object = value.as_object().ok_or(ParseFailure::NotAMapping)?;

    let mut mapping = HashMap::with_capacity(object.len());
    for (name, label) in object {
        let label = label.as_str().ok_or(ParseFailure::NotAMapping)?;
        mapping.insert(name.clone(), Gender::parse(label));
    }
    Ok(mapping)
}

/// Strategy (b): extract the contents of a fenced block (```json or
/// plain ```) for re-parsing.
pub fn extract_fenced(text: &str, marker: &str) -> std::result::Result<String, ParseFailure> {
    let after = text.split_once(marker).ok_or(ParseFailure::NoFencedBlock)?.1;
    let inner = after.split_once("```").ok_or(ParseFailure::NoFencedBlock)?.0;
    Ok(inner.trim().to_string())
}

/// Strategy (c): repair common syntax defects (trailing separators,
/// single-quote delimiters) and re-parse strictly.
pub fn parse_repaired(text: &str) -> Strategy {
    parse_strict(&repair_common_defects(text))
}

fn repair_common_defects(text: &str) -> String {
    let repaired = TRAILING_COMMA_RE.replace_all(text, "$1");
    let repaired = SINGLE_QUOTED_KEY_RE.replace_all(&repaired, "\"$1\"$2");
    let repaired = SINGLE_QUOTED_VALUE_RE.replace_all(&repaired, "$1\"$2\"");
    repaired.into_owned()
}

/// Strategy (d): last resort, extract individual `"name": "label"`
/// pairs regardless of the surrounding structure.
pub fn parse_pairs(text: &str) -> Strategy {
    let mut mapping = HashMap::new();
    for capture in PAIR_RE.captures_iter(text) {
        mapping.insert(capture[1].to_string(), Gender::parse(&capture[2]));
    }
    if mapping.is_empty() {
        return Err(ParseFailure::NoPairs);
    }
    Ok(mapping)
}

/// Run the full cascade over a raw response. Returns `None` only when
/// every strategy fails.
pub fn parse_classifications(text: &str) -> Option<HashMap<String, Gender>> {
    // Candidate texts: the raw response, then any fenced content
    let mut candidates = vec![text.to_string()];
    if let Ok(inner) = extract_fenced(text, "```json") {
        candidates.push(inner);
    } else if let Ok(inner) = extract_fenced(text, "```") {
        candidates.push(inner);
    }

    for candidate in &candidates {
        if let Ok(mapping) = parse_strict(candidate) {
            return Some(mapping);
        }
    }
    for candidate in &candidates {
        if let Ok(mapping) = parse_repaired(candidate) {
            return Some(mapping);
        }
    }

    parse_pairs(text).ok()
}
