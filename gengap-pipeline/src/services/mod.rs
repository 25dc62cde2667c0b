//! Pipeline services
//!
//! Name normalization, the layered gender classifier and its cache,
//! position assignment, and journal-quartile matching.

pub mod dictionary;
pub mod gender_cache;
pub mod genderize_client;
pub mod inference;
pub mod journal_matcher;
pub mod llm_classifier;
pub mod name_normalizer;
pub mod position_assigner;
pub mod response_parser;

use gengap_common::db::Gender;
use serde::{Deserialize, Serialize};

/// Outcome of one gender-classification attempt for one name.
///
/// `p_female` is always P(female); a male result resolved with
/// confidence `p` carries `1 - p`. Unresolved names carry `Unknown`
/// with no probability and no source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub gender: Gender,
    pub p_female: Option<f64>,
    /// Classifier tier that produced the label
    pub source: Option<String>,
}

impl Resolution {
    pub fn unresolved() -> Self {
        Self {
            gender: Gender::Unknown,
            p_female: None,
            source: None,
        }
    }
}
