//! Author-position link queries and the joined observation view

use gengap_common::db::AuthorPosition;
use gengap_common::Result;
use sqlx::SqlitePool;

/// Load a publication's link rows in author-list order
pub async fn links_for_publication(
    pool: &SqlitePool,
    publication_id: &str,
) -> Result<Vec<AuthorPosition>> {
    let rows: Vec<(String, String, i64, String)> = sqlx::query_as(
        r#"
        SELECT publication_id, author_id, author_index, position
        FROM author_positions
        WHERE publication_id = ?
        ORDER BY author_index
        "#,
    )
    .bind(publication_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(publication_id, author_id, author_index, position)| AuthorPosition {
                publication_id,
                author_id,
                author_index,
                position,
            },
        )
        .collect())
}

pub async fn count_links(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM author_positions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// One author slot joined with its publication and author rows; the
/// unit of every downstream aggregation.
#[derive(Debug, Clone)]
pub struct ObservationRow {
    pub source_id: String,
    pub year: i64,
    pub dataset: String,
    pub quartile: Option<String>,
    pub name: String,
    pub gender: String,
    pub p_female: Option<f64>,
    pub position: String,
}

/// Fetch the joined author-position view for a year range, the input
/// to all bootstrap sweeps.
pub async fn fetch_observations(
    pool: &SqlitePool,
    year_min: i64,
    year_max: i64,
) -> Result<Vec<ObservationRow>> {
    let rows: Vec<(
        String,
        i64,
        String,
        Option<String>,
        String,
        String,
        Option<f64>,
        String,
    )> = sqlx::query_as(
        r#"
        SELECT p.source_id, p.year, p.dataset, p.quartile,
               a.name, a.gender, a.p_female, ap.position
        FROM author_positions ap
        JOIN publications p ON ap.publication_id = p.guid
        JOIN authors a ON ap.author_id = a.guid
        WHERE p.year >= ? AND p.year <= ?
        ORDER BY p.year, p.dataset, p.source_id, ap.author_index
        "#,
    )
    .bind(year_min)
    .bind(year_max)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(source_id, year, dataset, quartile, name, gender, p_female, position)| {
                ObservationRow {
                    source_id,
                    year,
                    dataset,
                    quartile,
                    name,
                    gender,
                    p_female,
                    position,
                }
            },
        )
        .collect())
}
