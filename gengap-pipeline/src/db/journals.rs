//! Journal-quartile lookup table access

use gengap_common::db::JournalQuartileEntry;
use gengap_common::Result;
use sqlx::SqlitePool;

/// Record one matching outcome (matched or not). Overwrites on
/// rebuild; the table is otherwise read-only.
pub async fn insert_entry(pool: &SqlitePool, entry: &JournalQuartileEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO journal_quartiles (journal_name, matched_title, quartile, confidence, exact_match)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(journal_name) DO UPDATE SET
            matched_title = excluded.matched_title,
            quartile = excluded.quartile,
            confidence = excluded.confidence,
            exact_match = excluded.exact_match
        "#,
    )
    .bind(&entry.journal_name)
    .bind(&entry.matched_title)
    .bind(&entry.quartile)
    .bind(entry.confidence)
    .bind(entry.exact_match)
    .execute(pool)
    .await?;
    Ok(())
}

/// (matched, unmatched) counts over the lookup table
pub async fn match_counts(pool: &SqlitePool) -> Result<(i64, i64)> {
    let matched: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM journal_quartiles WHERE quartile IS NOT NULL")
            .fetch_one(pool)
            .await?;
    let unmatched: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM journal_quartiles WHERE quartile IS NULL")
            .fetch_one(pool)
            .await?;
    Ok((matched, unmatched))
}
