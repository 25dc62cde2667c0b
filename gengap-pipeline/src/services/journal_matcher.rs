//! Journal-quartile fuzzy matcher
//!
//! Matches free-text journal names from publication records against a
//! reference ranking table. Exact normalized matches are taken first;
//! otherwise the best fuzzy candidate above the similarity threshold
//! wins. Matching runs once over the distinct journal vocabulary of
//! the corpus and is cached in the journal_quartiles table, because
//! scanning a reference table of tens of thousands of titles per name
//! is the dominant cost.
//!
//! Tie-break on equal similarity: longer common prefix with the query,
//! then lexicographically smaller reference title.

use gengap_common::db::Quartile;
use gengap_common::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Minimum normalized-Levenshtein similarity for a fuzzy match
pub const MATCH_THRESHOLD: f64 = 0.8;

/// A successful reference-table match
#[derive(Debug, Clone, PartialEq)]
pub struct JournalMatch {
    /// Reference title as it appears in the ranking table
    pub title: String,
    pub quartile: Quartile,
    pub confidence: f64,
    pub exact: bool,
}

#[derive(Debug)]
struct ReferenceEntry {
    normalized: String,
    title: String,
    quartile: Quartile,
}

/// Reference ranking table with exact and fuzzy lookup
#[derive(Debug)]
pub struct QuartileMatcher {
    entries: Vec<ReferenceEntry>,
    exact: HashMap<String, usize>,
}

impl QuartileMatcher {
    /// Load a semicolon-delimited ranking table of `title;quartile`
    /// rows. Rows without a Q1-Q4 tier are ignored (unranked
    /// journals).
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                Error::Config(format!(
                    "Read journal rankings {} failed: {}",
                    path.display(),
                    e
                ))
            })?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| Error::InvalidInput(format!("Malformed ranking row: {}", e)))?;
            let (Some(title), Some(tier)) = (record.get(0), record.get(1)) else {
                continue;
            };
            if let Some(quartile) = Quartile::parse(tier) {
                rows.push((title.to_string(), quartile));
            }
        }

        if rows.is_empty() {
            return Err(Error::Config(format!(
                "Journal ranking table {} contains no ranked journals",
                path.display()
            )));
        }

        info!("Loaded {} ranked journals from {}", rows.len(), path.display());
        Ok(Self::from_entries(rows))
    }

    /// Build directly from (title, quartile) pairs; used by tests.
    pub fn from_entries(rows: Vec<(String, Quartile)>) -> Self {
        let mut entries = Vec::with_capacity(rows.len());
        let mut exact = HashMap::with_capacity(rows.len());
        for (title, quartile) in rows {
            let normalized = normalize_title(&title);
            // First occurrence wins on duplicate titles
            exact.entry(normalized.clone()).or_insert(entries.len());
            entries.push(ReferenceEntry {
                normalized,
                title,
                quartile,
            });
        }
        Self { entries, exact }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Match one free-text journal name. Returns `None` when no
    /// reference title reaches the similarity threshold.
    pub fn match_name(&self, raw: &str) -> Option<JournalMatch> {
        let normalized = normalize_title(raw);
        if normalized.is_empty() {
            return None;
        }

        if let Some(&index) = self.exact.get(&normalized) {
            let entry = &self.entries[index];
            return Some(JournalMatch {
                title: entry.title.clone(),
                quartile: entry.quartile,
                confidence: 1.0,
                exact: true,
            });
        }

        let mut best: Option<(&ReferenceEntry, f64)> = None;
        for entry in &self.entries {
            let score = strsim::normalized_levenshtein(&normalized, &entry.normalized);
            if score < MATCH_THRESHOLD {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, current_score)) => {
                    if score != current_score {
                        score > current_score
                    } else {
                        beats_on_tie(&normalized, entry, current)
                    }
                }
            };
            if better {
                best = Some((entry, score));
            }
        }

        best.map(|(entry, score)| JournalMatch {
            title: entry.title.clone(),
            quartile: entry.quartile,
            confidence: score,
            exact: false,
        })
    }
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Deterministic tie-break: longer common prefix with the query wins,
/// then the lexicographically smaller reference title.
fn beats_on_tie(query: &str, candidate: &ReferenceEntry, current: &ReferenceEntry) -> bool {
    let candidate_prefix = common_prefix_len(query, &candidate.normalized);
    let current_prefix = common_prefix_len(query, &current.normalized);
    if candidate_prefix != current_prefix {
        return candidate_prefix > current_prefix;
    }
    candidate.normalized < current.normalized
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> QuartileMatcher {
        QuartileMatcher::from_entries(vec![
            ("PLOS Computational Biology".to_string(), Quartile::Q1),
            ("Bioinformatics".to_string(), Quartile::Q1),
            ("BMC Bioinformatics".to_string(), Quartile::Q2),
            ("Journal of Theoretical Biology".to_string(), Quartile::Q2),
        ])
    }

    #[test]
    fn loads_semicolon_table_skipping_unranked_rows() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Title;Best Quartile").unwrap();
        writeln!(file, "Bioinformatics;Q1").unwrap();
        writeln!(file, "Obscure Gazette;-").unwrap();
        writeln!(file, "BMC Bioinformatics;Q2").unwrap();

        let matcher = QuartileMatcher::load(file.path()).unwrap();
        assert_eq!(matcher.len(), 2);
        let m = matcher.match_name("bioinformatics").unwrap();
        assert_eq!(m.quartile, Quartile::Q1);
        assert!(matcher.match_name("Obscure Gazette").is_none());
    }

    #[test]
    fn missing_rankings_file_is_config_error() {
        let err = QuartileMatcher::load(std::path::Path::new("/nonexistent/rankings.csv"))
            .unwrap_err();
        assert!(matches!(err, gengap_common::Error::Config(_)));
    }

    #[test]
    fn exact_match_ignores_case_and_whitespace() {
        let m = matcher().match_name("  plos computational biology ").unwrap();
        assert!(m.exact);
        assert_eq!(m.quartile, Quartile::Q1);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn fuzzy_match_recovers_small_typos() {
        let m = matcher().match_name("Bioinformatcs").unwrap();
        assert!(!m.exact);
        assert_eq!(m.title, "Bioinformatics");
        assert!(m.confidence >= MATCH_THRESHOLD);
    }

    #[test]
    fn distant_names_do_not_match() {
        assert!(matcher().match_name("Annals of Mathematics").is_none());
        assert!(matcher().match_name("").is_none());
    }

    #[test]
    fn tie_break_is_deterministic() {
        let tied = QuartileMatcher::from_entries(vec![
            ("Journal of Results B".to_string(), Quartile::Q2),
            ("Journal of Results A".to_string(), Quartile::Q3),
        ]);

        // Equidistant from both entries; the lexicographically
        // smaller title must win, on every run
        let m = tied.match_name("Journal of Results").unwrap();
        assert_eq!(m.title, "Journal of Results A");
        assert_eq!(m.quartile, Quartile::Q3);
    }

    #[test]
    fn prefix_overlap_beats_lexicographic_order() {
        // Both candidates are one edit away from the query, so the
        // similarity scores tie; the shared-prefix rule must decide
        // before the lexicographic fallback
        let tied = QuartileMatcher::from_entries(vec![
            ("journal of proteomicz".to_string(), Quartile::Q4),
            ("aournal of proteomics".to_string(), Quartile::Q1),
        ]);

        let m = tied.match_name("Journal of Proteomics").unwrap();
        assert_eq!(m.quartile, Quartile::Q4);
        assert_eq!(m.title, "journal of proteomicz");
    }
}
