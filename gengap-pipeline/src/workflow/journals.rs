//! Journal-quartile matching pass
//!
//! One-time batch pass over the distinct journal vocabulary of the
//! corpus. Every outcome is cached, including "no match", so repeat
//! runs are bounded by vocabulary growth only. Afterwards the
//! resolved tiers are attached to publications.

use crate::db::{journals, publications};
use crate::services::journal_matcher::QuartileMatcher;
use gengap_common::db::JournalQuartileEntry;
use gengap_common::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Counters for one matching pass
#[derive(Debug, Clone, Default)]
pub struct JournalMatchOutcome {
    /// Journal names processed this run (not yet in the lookup table)
    pub vocabulary: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Publications that now carry a quartile tier
    pub publications_tagged: u64,
}

pub async fn match_journal_quartiles(
    pool: &SqlitePool,
    matcher: &QuartileMatcher,
) -> Result<JournalMatchOutcome> {
    let vocabulary = publications::distinct_unmatched_journals(pool).await?;
    let mut outcome = JournalMatchOutcome {
        vocabulary: vocabulary.len(),
        ..Default::default()
    };
    info!(
        "Matching {} distinct journal names against {} ranked titles",
        vocabulary.len(),
        matcher.len()
    );

    for journal_name in vocabulary {
        let entry = match matcher.match_name(&journal_name) {
            Some(found) => {
                outcome.matched += 1;
                JournalQuartileEntry {
                    journal_name,
                    matched_title: Some(found.title),
                    quartile: Some(found.quartile.as_str().to_string()),
                    confidence: Some(found.confidence),
                    exact_match: found.exact,
                }
            }
            None => {
                outcome.unmatched += 1;
                JournalQuartileEntry {
                    journal_name,
                    matched_title: None,
                    quartile: None,
                    confidence: None,
                    exact_match: false,
                }
            }
        };
        journals::insert_entry(pool, &entry).await?;
    }

    outcome.publications_tagged = publications::attach_quartiles(pool).await?;
    info!(
        "Journal matching done: {} matched, {} unmatched, {} publications tagged",
        outcome.matched, outcome.unmatched, outcome.publications_tagged
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PublicationRecord;
    use crate::workflow::ingest::ingest_records;
    use gengap_common::db::init_memory_database;
    use gengap_common::db::Quartile;

    fn record(source_id: &str, journal: Option<&str>) -> PublicationRecord {
        PublicationRecord {
            source_id: source_id.to_string(),
            title: None,
            year: 2021,
            journal: journal.map(|j| j.to_string()),
            dataset: Some("Biology".to_string()),
            authors: vec!["Maria Garcia".to_string()],
        }
    }

    fn matcher() -> QuartileMatcher {
        QuartileMatcher::from_entries(vec![
            ("Bioinformatics".to_string(), Quartile::Q1),
            ("BMC Bioinformatics".to_string(), Quartile::Q2),
        ])
    }

    #[tokio::test]
    async fn matches_attach_tiers_to_publications() {
        let pool = init_memory_database().await.unwrap();
        let records = vec![
            record("PMID:1", Some("Bioinformatics")),
            record("PMID:2", Some("Obscure Gazette")),
            record("PMID:3", None),
        ];
        ingest_records(&pool, &records, None).await.unwrap();

        let outcome = match_journal_quartiles(&pool, &matcher()).await.unwrap();
        assert_eq!(outcome.vocabulary, 2);
        assert_eq!(outcome.matched, 1);
        assert_eq!(outcome.unmatched, 1);
        assert_eq!(outcome.publications_tagged, 1);

        let quartile: Option<String> =
            sqlx::query_scalar("SELECT quartile FROM publications WHERE source_id = 'PMID:1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(quartile.as_deref(), Some("Q1"));
    }

    #[tokio::test]
    async fn repeat_runs_skip_cached_vocabulary() {
        let pool = init_memory_database().await.unwrap();
        ingest_records(
            &pool,
            &[record("PMID:1", Some("Obscure Gazette"))],
            None,
        )
        .await
        .unwrap();

        let first = match_journal_quartiles(&pool, &matcher()).await.unwrap();
        assert_eq!(first.vocabulary, 1);

        // Unmatched names are not retried
        let second = match_journal_quartiles(&pool, &matcher()).await.unwrap();
        assert_eq!(second.vocabulary, 0);
    }
}
