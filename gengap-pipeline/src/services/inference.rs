//! Layered gender-inference engine
//!
//! Composes the classifier tiers into an ordered resolver chain:
//! cache lookup first, then each tier until one yields a confident
//! result. Every outcome, including "unresolved", is written back to
//! the cache so no name is queried twice against the same tier. Tier
//! failures (network, rate limit, malformed response) advance the
//! chain instead of failing the run.

use crate::services::gender_cache::GenderCache;
use crate::services::Resolution;
use async_trait::async_trait;
use tracing::warn;

/// One tier of the classification chain. `Ok(None)` means "no
/// confident result, try the next tier"; errors are treated the same
/// way by the engine, after logging.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Tier identifier, recorded as result provenance
    fn id(&self) -> &'static str;

    async fn attempt(&self, name: &str) -> anyhow::Result<Option<Resolution>>;
}

/// Classification result plus where it came from
#[derive(Debug, Clone)]
pub struct Classification {
    pub resolution: Resolution,
    pub from_cache: bool,
}

/// Ordered chain of resolvers behind a shared persistent cache
pub struct GenderInferenceEngine {
    cache: GenderCache,
    resolvers: Vec<Box<dyn NameResolver>>,
}

impl GenderInferenceEngine {
    pub fn new(cache: GenderCache, resolvers: Vec<Box<dyn NameResolver>>) -> Self {
        Self { cache, resolvers }
    }

    pub fn cache(&self) -> &GenderCache {
        &self.cache
    }

    /// Classify one normalized given name.
    ///
    /// Names of a single character are unresolvable by construction
    /// and never reach the cache or any tier.
    pub async fn classify(&self, name: &str) -> Classification {
        if name.chars().count() <= 1 {
            return Classification {
                resolution: Resolution::unresolved(),
                from_cache: false,
            };
        }

        if let Some(resolution) = self.cache.get(name).await {
            return Classification {
                resolution,
                from_cache: true,
            };
        }

        for resolver in &self.resolvers {
            match resolver.attempt(name).await {
                Ok(Some(resolution)) => {
                    self.cache.put(name, resolution.clone()).await;
                    return Classification {
                        resolution,
                        from_cache: false,
                    };
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(tier = resolver.id(), name = %name, %error, "Resolver tier failed, advancing");
                }
            }
        }

        // Unresolved is an outcome too; cache it so the tiers are
        // never consulted again for this name
        let resolution = Resolution::unresolved();
        self.cache.put(name, resolution.clone()).await;
        Classification {
            resolution,
            from_cache: false,
        }
    }
}
