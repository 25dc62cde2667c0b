//! Database models and label vocabularies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gender label attached to a normalized given name.
///
/// Probabilities throughout the pipeline are expressed as P(female);
/// a male result with service confidence 0.9 is stored as 0.1.
/// Labels outside the binary vocabulary arriving from upstream sources
/// are preserved verbatim as `Other` and excluded from P(female)
/// aggregation, but still counted in summaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
    Other(String),
}

impl Gender {
    pub fn as_str(&self) -> &str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
            Gender::Other(label) => label,
        }
    }

    /// Parse a stored or upstream label. Empty/NULL-ish labels map to
    /// `Unknown`; anything unrecognized is preserved as `Other`.
    pub fn parse(label: &str) -> Gender {
        match label.trim().to_ascii_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            "" | "unknown" => Gender::Unknown,
            _ => Gender::Other(label.trim().to_string()),
        }
    }

    /// Whether this label participates in P(female) aggregation.
    pub fn is_binary(&self) -> bool {
        matches!(self, Gender::Male | Gender::Female)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural author position within one publication's author list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    First,
    Second,
    Middle,
    Penultimate,
    Last,
}

impl Position {
    /// All labels, in report ordering
    pub const ALL: [Position; 5] = [
        Position::First,
        Position::Second,
        Position::Middle,
        Position::Penultimate,
        Position::Last,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::First => "first",
            Position::Second => "second",
            Position::Middle => "middle",
            Position::Penultimate => "penultimate",
            Position::Last => "last",
        }
    }

    pub fn parse(label: &str) -> Option<Position> {
        match label {
            "first" => Some(Position::First),
            "second" => Some(Position::Second),
            "middle" => Some(Position::Middle),
            "penultimate" => Some(Position::Penultimate),
            "last" => Some(Position::Last),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Journal impact-ranking bucket (Q1 highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quartile {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quartile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quartile::Q1 => "Q1",
            Quartile::Q2 => "Q2",
            Quartile::Q3 => "Q3",
            Quartile::Q4 => "Q4",
        }
    }

    pub fn parse(label: &str) -> Option<Quartile> {
        match label.trim() {
            "Q1" => Some(Quartile::Q1),
            "Q2" => Some(Quartile::Q2),
            "Q3" => Some(Quartile::Q3),
            "Q4" => Some(Quartile::Q4),
            _ => None,
        }
    }
}

impl fmt::Display for Quartile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub guid: String,
    /// External source identifier (PMID, arXiv id, ...), unique
    pub source_id: String,
    pub title: Option<String>,
    pub year: i64,
    /// Journal name as it appeared in the source record
    pub journal: Option<String>,
    /// Source corpus tag
    pub dataset: String,
    /// Resolved impact tier, attached by the quartile matcher
    pub quartile: Option<String>,
}

/// Author row: one record per normalized given name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub guid: String,
    /// Normalized given-name token (unit of gender inference)
    pub name: String,
    pub gender: String,
    /// P(female) in [0, 1], NULL while unresolved
    pub p_female: Option<f64>,
    /// Which classifier tier produced the label
    pub source: Option<String>,
}

/// One author slot of one publication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorPosition {
    pub publication_id: String,
    pub author_id: String,
    /// Zero-based index in the publication's author list
    pub author_index: i64,
    pub position: String,
}

/// Cached fuzzy-match outcome for one free-text journal name.
/// Unmatched names are stored with a NULL quartile so they are not
/// retried on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalQuartileEntry {
    pub journal_name: String,
    pub matched_title: Option<String>,
    pub quartile: Option<String>,
    pub confidence: Option<f64>,
    pub exact_match: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_parse_round_trip() {
        assert_eq!(Gender::parse("male"), Gender::Male);
        assert_eq!(Gender::parse("FEMALE"), Gender::Female);
        assert_eq!(Gender::parse(""), Gender::Unknown);
        assert_eq!(Gender::parse("unknown"), Gender::Unknown);
        assert_eq!(
            Gender::parse("nonbinary"),
            Gender::Other("nonbinary".to_string())
        );
    }

    #[test]
    fn other_labels_excluded_from_aggregation() {
        assert!(Gender::Male.is_binary());
        assert!(Gender::Female.is_binary());
        assert!(!Gender::Unknown.is_binary());
        assert!(!Gender::Other("neutral".to_string()).is_binary());
    }

    #[test]
    fn position_labels_round_trip() {
        for position in Position::ALL {
            assert_eq!(Position::parse(position.as_str()), Some(position));
        }
        assert_eq!(Position::parse("corresponding"), None);
    }

    #[test]
    fn quartile_parse() {
        assert_eq!(Quartile::parse("Q1"), Some(Quartile::Q1));
        assert_eq!(Quartile::parse(" Q4 "), Some(Quartile::Q4));
        assert_eq!(Quartile::parse("Q5"), None);
    }
}
