//! Author queries
//!
//! One author row per normalized given name; classification results
//! overwrite in place, so re-inference never duplicates.

use crate::services::Resolution;
use gengap_common::db::{Author, Gender};
use gengap_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// Load one author record by normalized given name
pub async fn fetch_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Author>> {
    let row: Option<(String, String, String, Option<f64>, Option<String>)> = sqlx::query_as(
        "SELECT guid, name, gender, p_female, source FROM authors WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(guid, name, gender, p_female, source)| Author {
        guid,
        name,
        gender,
        p_female,
        source,
    }))
}

/// Names still awaiting a confident classification. Single-character
/// names are unresolvable by construction and excluded here.
pub async fn unresolved_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT name FROM authors
        WHERE (source IS NULL OR gender = 'unknown') AND LENGTH(name) > 1
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Overwrite an author's classification with a new chain outcome.
pub async fn update_classification(
    pool: &SqlitePool,
    name: &str,
    resolution: &Resolution,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE authors
        SET gender = ?, p_female = ?, source = ?, updated_at = CURRENT_TIMESTAMP
        WHERE name = ?
        "#,
    )
    .bind(resolution.gender.as_str())
    .bind(resolution.p_female)
    .bind(&resolution.source)
    .bind(name)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count_authors(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Gender label counts over the authors table
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenderBreakdown {
    pub total: i64,
    pub male: i64,
    pub female: i64,
    pub unknown: i64,
    pub other: i64,
}

/// Count authors per gender label. With `exclude_initials`, authors
/// whose stored name is a single character (bare initials) are left
/// out, mirroring the filtered variant of the published analysis.
pub async fn gender_breakdown(pool: &SqlitePool, exclude_initials: bool) -> Result<GenderBreakdown> {
    let query = if exclude_initials {
        "SELECT gender, COUNT(*) FROM authors WHERE LENGTH(name) > 1 GROUP BY gender"
    } else {
        "SELECT gender, COUNT(*) FROM authors GROUP BY gender"
    };

    let rows: Vec<(String, i64)> = sqlx::query_as(query).fetch_all(pool).await?;

    let mut breakdown = GenderBreakdown::default();
    for (label, count) in rows {
        breakdown.total += count;
        match Gender::parse(&label) {
            Gender::Male => breakdown.male += count,
            Gender::Female => breakdown.female += count,
            Gender::Unknown => breakdown.unknown += count,
            Gender::Other(_) => breakdown.other += count,
        }
    }
    Ok(breakdown)
}
