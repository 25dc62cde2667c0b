//! Database initialization
//!
//! Creates the normalized relational schema on first run. All
//! statements are idempotent, so initialization is safe to repeat on
//! every startup and incremental ingestion never requires re-keying
//! existing rows.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_pragmas(&pool).await?;
    create_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database for tests and dry runs; same schema as on disk.
/// Pinned to one connection: every pooled connection would otherwise
/// open its own private :memory: database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    configure_pragmas(&pool).await?;
    create_tables(&pool).await?;
    Ok(pool)
}

async fn configure_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers while ingestion writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_publications_table(pool).await?;
    create_authors_table(pool).await?;
    create_author_positions_table(pool).await?;
    create_journal_quartiles_table(pool).await?;
    create_gender_cache_table(pool).await?;
    Ok(())
}

/// Create the publications table
///
/// One row per unique external source ID. Rows are never deleted;
/// the only post-ingest mutation is attaching a quartile tier.
async fn create_publications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publications (
            guid TEXT PRIMARY KEY,
            source_id TEXT NOT NULL UNIQUE,
            title TEXT,
            year INTEGER NOT NULL,
            journal TEXT,
            dataset TEXT NOT NULL,
            quartile TEXT CHECK (quartile IS NULL OR quartile IN ('Q1', 'Q2', 'Q3', 'Q4')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (year > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_publications_year ON publications(year)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_publications_dataset ON publications(dataset)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the authors table
///
/// One row per normalized given name; distinct people sharing a given
/// name share one inference result.
async fn create_authors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            gender TEXT NOT NULL DEFAULT 'unknown',
            p_female REAL,
            source TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (p_female IS NULL OR (p_female >= 0.0 AND p_female <= 1.0))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_authors_gender ON authors(gender)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the author_positions linking table
///
/// Exactly one row per author slot of a publication; re-ingesting a
/// publication replaces its whole link set inside one transaction.
async fn create_author_positions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS author_positions (
            publication_id TEXT NOT NULL REFERENCES publications(guid) ON DELETE CASCADE,
            author_id TEXT NOT NULL REFERENCES authors(guid),
            author_index INTEGER NOT NULL,
            position TEXT NOT NULL CHECK (position IN ('first', 'second', 'middle', 'penultimate', 'last')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (publication_id, author_index),
            CHECK (author_index >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_author_positions_position ON author_positions(position)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_author_positions_author ON author_positions(author_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the journal_quartiles lookup table
///
/// Built once per rankings refresh by the batch fuzzy-match pass, then
/// read-only. Keyed by the exact free-text journal name from source
/// records; unmatched names are recorded so they are not retried.
async fn create_journal_quartiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS journal_quartiles (
            journal_name TEXT PRIMARY KEY,
            matched_title TEXT,
            quartile TEXT CHECK (quartile IS NULL OR quartile IN ('Q1', 'Q2', 'Q3', 'Q4')),
            confidence REAL,
            exact_match INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the gender_cache table
///
/// Durable form of the classifier cache. cache_version is bumped when
/// tier logic changes so stale results are never trusted as fresh.
async fn create_gender_cache_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gender_cache (
            name TEXT PRIMARY KEY,
            gender TEXT NOT NULL,
            p_female REAL,
            source TEXT,
            cache_version INTEGER NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (p_female IS NULL OR (p_female >= 0.0 AND p_female <= 1.0))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        // A second pass over the same pool must not fail
        create_tables(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn link_rows_unique_per_slot() {
        let pool = init_memory_database().await.unwrap();

        sqlx::query("INSERT INTO publications (guid, source_id, year, dataset) VALUES ('p1', 'PMID:1', 2020, 'Biology')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO authors (guid, name) VALUES ('a1', 'maria')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO author_positions (publication_id, author_id, author_index, position) \
             VALUES ('p1', 'a1', 0, 'first')",
        )
        .execute(&pool)
        .await
        .unwrap();

        // Same (publication, index) slot must be rejected
        let dup = sqlx::query(
            "INSERT INTO author_positions (publication_id, author_id, author_index, position) \
             VALUES ('p1', 'a1', 0, 'last')",
        )
        .execute(&pool)
        .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn probability_bounds_enforced() {
        let pool = init_memory_database().await.unwrap();

        let bad = sqlx::query("INSERT INTO authors (guid, name, p_female) VALUES ('a1', 'x', 1.5)")
            .execute(&pool)
            .await;
        assert!(bad.is_err());
    }
}
