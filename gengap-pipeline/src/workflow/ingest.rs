//! Publication ingestion
//!
//! Writes publication, author, and author-position rows from a record
//! batch. Each publication is one transaction: its link set is cleared
//! and reinserted atomically, so re-ingesting the same record is
//! idempotent and a failure never leaves a publication with a partial
//! link set. A failing record is logged and skipped; the rest of the
//! batch proceeds.

use crate::records::PublicationRecord;
use crate::services::name_normalizer::normalize_given_name;
use crate::services::position_assigner::assign_positions;
use gengap_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

/// Counters for one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub ingested: usize,
    pub failed: usize,
    pub link_rows: usize,
}

/// Ingest a batch of publication records. `dataset_override` fills in
/// the dataset tag for records that do not carry one.
pub async fn ingest_records(
    pool: &SqlitePool,
    records: &[PublicationRecord],
    dataset_override: Option<&str>,
) -> Result<IngestOutcome> {
    let mut outcome = IngestOutcome::default();

    for record in records {
        match ingest_one(pool, record, dataset_override).await {
            Ok(links) => {
                outcome.ingested += 1;
                outcome.link_rows += links;
            }
            Err(error) => {
                warn!(source_id = %record.source_id, %error, "Skipping publication");
                outcome.failed += 1;
            }
        }
    }

    info!(
        "Ingested {} publications ({} author slots), {} failed",
        outcome.ingested, outcome.link_rows, outcome.failed
    );
    Ok(outcome)
}

/// Ingest one publication inside its own transaction. Returns the
/// number of link rows written.
async fn ingest_one(
    pool: &SqlitePool,
    record: &PublicationRecord,
    dataset_override: Option<&str>,
) -> Result<usize> {
    if record.source_id.trim().is_empty() {
        return Err(Error::InvalidInput("empty source_id".to_string()));
    }
    if record.year <= 0 {
        return Err(Error::InvalidInput(format!("invalid year {}", record.year)));
    }
    let dataset = record
        .dataset
        .as_deref()
        .or(dataset_override)
        .ok_or_else(|| Error::InvalidInput("no dataset tag for record or run".to_string()))?;

    let mut tx = pool.begin().await?;

    let publication_id = upsert_publication(&mut tx, record, dataset).await?;

    // Replace the whole link set so reruns never duplicate
    sqlx::query("DELETE FROM author_positions WHERE publication_id = ?")
        .bind(&publication_id)
        .execute(&mut *tx)
        .await?;

    let positions = assign_positions(record.authors.len());
    for (index, raw_name) in record.authors.iter().enumerate() {
        let given = normalize_given_name(raw_name);
        let author_id = ensure_author(&mut tx, given.as_str()).await?;

        sqlx::query(
            r#"
            INSERT INTO author_positions (publication_id, author_id, author_index, position)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&publication_id)
        .bind(&author_id)
        .bind(index as i64)
        .bind(positions[index].as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(record.authors.len())
}

/// Create or refresh the publication row, keyed on the external source
/// ID. The guid is stable across re-ingestion.
async fn upsert_publication(
    tx: &mut Transaction<'_, Sqlite>,
    record: &PublicationRecord,
    dataset: &str,
) -> Result<String> {
    sqlx::query(
        r#"
        INSERT INTO publications (guid, source_id, title, year, journal, dataset)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(source_id) DO UPDATE SET
            title = excluded.title,
            year = excluded.year,
            journal = excluded.journal,
            dataset = excluded.dataset,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&record.source_id)
    .bind(&record.title)
    .bind(record.year)
    .bind(&record.journal)
    .bind(dataset)
    .execute(&mut **tx)
    .await?;

    let (guid,): (String,) = sqlx::query_as("SELECT guid FROM publications WHERE source_id = ?")
        .bind(&record.source_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(guid)
}

/// Create the author row for a normalized name on first encounter;
/// later encounters reuse it. Classification fills in gender later.
async fn ensure_author(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<String> {
    sqlx::query(
        r#"
        INSERT INTO authors (guid, name) VALUES (?, ?)
        ON CONFLICT(name) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .execute(&mut **tx)
    .await?;

    let (guid,): (String,) = sqlx::query_as("SELECT guid FROM authors WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;
    Ok(guid)
}
