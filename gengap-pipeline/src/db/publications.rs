//! Publication queries

use gengap_common::db::Publication;
use gengap_common::Result;
use sqlx::SqlitePool;

/// Load a publication by its external source identifier
pub async fn fetch_by_source_id(
    pool: &SqlitePool,
    source_id: &str,
) -> Result<Option<Publication>> {
    let row: Option<(String, String, Option<String>, i64, Option<String>, String, Option<String>)> =
        sqlx::query_as(
            r#"
            SELECT guid, source_id, title, year, journal, dataset, quartile
            FROM publications
            WHERE source_id = ?
            "#,
        )
        .bind(source_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(
        |(guid, source_id, title, year, journal, dataset, quartile)| Publication {
            guid,
            source_id,
            title,
            year,
            journal,
            dataset,
            quartile,
        },
    ))
}

pub async fn count_publications(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM publications")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Distinct journal names that have not been through the quartile
/// matcher yet. Bounded by vocabulary growth, not corpus size.
pub async fn distinct_unmatched_journals(pool: &SqlitePool) -> Result<Vec<String>> {
    let names: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT journal FROM publications
        WHERE journal IS NOT NULL AND journal != ''
          AND journal NOT IN (SELECT journal_name FROM journal_quartiles)
        ORDER BY journal
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(names.into_iter().map(|(name,)| name).collect())
}

/// Attach resolved quartile tiers to publications from the lookup
/// table. The only mutation publications ever receive after ingest.
pub async fn attach_quartiles(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE publications
        SET quartile = (
                SELECT jq.quartile FROM journal_quartiles jq
                WHERE jq.journal_name = publications.journal
            ),
            updated_at = CURRENT_TIMESTAMP
        WHERE journal IN (
            SELECT journal_name FROM journal_quartiles WHERE quartile IS NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
