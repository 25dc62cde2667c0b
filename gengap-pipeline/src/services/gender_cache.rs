//! Persistent name -> gender cache
//!
//! Single source of truth for avoiding redundant classifier calls.
//! The in-memory map is safe for concurrent lookups while service
//! requests are in flight; dirty entries are flushed to the
//! gender_cache table so a crash mid-run does not force re-querying
//! names that were already resolved.

use crate::services::Resolution;
use gengap_common::db::Gender;
use gengap_common::Result;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Bump when tier logic or the cached value format changes, so stale
/// results are never trusted as fresh.
pub const GENDER_CACHE_VERSION: i64 = 1;

struct CacheInner {
    entries: HashMap<String, Resolution>,
    dirty: HashSet<String>,
}

/// Classifier cache with injected persistence: an in-memory map for
/// tests, loaded from and flushed to SQLite in production.
pub struct GenderCache {
    inner: RwLock<CacheInner>,
}

impl GenderCache {
    /// Empty cache, not backed by any store until flushed.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                dirty: HashSet::new(),
            }),
        }
    }

    /// Load cached entries from the database, discarding rows written
    /// by an older tier-logic version.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let stale = sqlx::query("DELETE FROM gender_cache WHERE cache_version != ?")
            .bind(GENDER_CACHE_VERSION)
            .execute(pool)
            .await?
            .rows_affected();
        if stale > 0 {
            info!("Discarded {} stale gender cache entries", stale);
        }

        let rows: Vec<(String, String, Option<f64>, Option<String>)> = sqlx::query_as(
            "SELECT name, gender, p_female, source FROM gender_cache WHERE cache_version = ?",
        )
        .bind(GENDER_CACHE_VERSION)
        .fetch_all(pool)
        .await?;

        let mut entries = HashMap::with_capacity(rows.len());
        for (name, gender, p_female, source) in rows {
            entries.insert(
                name,
                Resolution {
                    gender: Gender::parse(&gender),
                    p_female,
                    source,
                },
            );
        }

        info!("Loaded gender cache with {} entries", entries.len());
        Ok(Self {
            inner: RwLock::new(CacheInner {
                entries,
                dirty: HashSet::new(),
            }),
        })
    }

    pub async fn get(&self, name: &str) -> Option<Resolution> {
        self.inner.read().await.entries.get(name).cloned()
    }

    /// Record a classification outcome, including "unresolved".
    pub async fn put(&self, name: &str, resolution: Resolution) {
        let mut inner = self.inner.write().await;
        inner.entries.insert(name.to_string(), resolution);
        inner.dirty.insert(name.to_string());
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Write dirty entries back to the database. Returns the number of
    /// rows written; safe to call repeatedly during a long run.
    pub async fn flush(&self, pool: &SqlitePool) -> Result<usize> {
        let dirty: Vec<(String, Resolution)> = {
            let inner = self.inner.read().await;
            inner
                .dirty
                .iter()
                .filter_map(|name| {
                    inner
                        .entries
                        .get(name)
                        .map(|resolution| (name.clone(), resolution.clone()))
                })
                .collect()
        };

        if dirty.is_empty() {
            return Ok(0);
        }

        for (name, resolution) in &dirty {
            sqlx::query(
                r#"
                INSERT INTO gender_cache (name, gender, p_female, source, cache_version)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(name) DO UPDATE SET
                    gender = excluded.gender,
                    p_female = excluded.p_female,
                    source = excluded.source,
                    cache_version = excluded.cache_version,
                    updated_at = CURRENT_TIMESTAMP
                "#,
            )
            .bind(name)
            .bind(resolution.gender.as_str())
            .bind(resolution.p_female)
            .bind(&resolution.source)
            .bind(GENDER_CACHE_VERSION)
            .execute(pool)
            .await?;
        }

        let mut inner = self.inner.write().await;
        for (name, _) in &dirty {
            inner.dirty.remove(name);
        }

        debug!("Flushed {} gender cache entries", dirty.len());
        Ok(dirty.len())
    }
}

impl Default for GenderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gengap_common::db::init_memory_database;

    fn female(p: f64, source: &str) -> Resolution {
        Resolution {
            gender: Gender::Female,
            p_female: Some(p),
            source: Some(source.to_string()),
        }
    }

    #[tokio::test]
    async fn put_then_get() {
        let cache = GenderCache::new();
        cache.put("maria", female(1.0, "dictionary")).await;

        let hit = cache.get("maria").await.unwrap();
        assert_eq!(hit.gender, Gender::Female);
        assert_eq!(hit.p_female, Some(1.0));
        assert!(cache.get("noah").await.is_none());
    }

    #[tokio::test]
    async fn flush_and_reload_round_trip() {
        let pool = init_memory_database().await.unwrap();

        let cache = GenderCache::new();
        cache.put("maria", female(0.75, "dictionary")).await;
        cache.put("sam", Resolution::unresolved()).await;
        assert_eq!(cache.flush(&pool).await.unwrap(), 2);
        // Nothing left dirty
        assert_eq!(cache.flush(&pool).await.unwrap(), 0);

        let reloaded = GenderCache::load(&pool).await.unwrap();
        assert_eq!(reloaded.len().await, 2);
        let sam = reloaded.get("sam").await.unwrap();
        assert_eq!(sam.gender, Gender::Unknown);
        assert_eq!(sam.p_female, None);
        assert_eq!(sam.source, None);
    }

    #[tokio::test]
    async fn stale_versions_dropped_on_load() {
        let pool = init_memory_database().await.unwrap();

        sqlx::query(
            "INSERT INTO gender_cache (name, gender, p_female, source, cache_version) \
             VALUES ('old', 'male', 0.0, 'dictionary', ?)",
        )
        .bind(GENDER_CACHE_VERSION - 1)
        .execute(&pool)
        .await
        .unwrap();

        let cache = GenderCache::load(&pool).await.unwrap();
        assert!(cache.get("old").await.is_none());
    }
}
