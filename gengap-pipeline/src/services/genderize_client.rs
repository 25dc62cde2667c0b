//! Probabilistic name-gender service client
//!
//! Second inference tier: queries a genderize.io-style service for
//! names the offline dictionary could not resolve. Results below the
//! acceptance threshold are treated as no-result so a weak guess never
//! becomes a gender assignment. Requests are rate-limited client-side
//! and carry a timeout; any failure is non-fatal to the chain.

use crate::services::inference::NameResolver;
use crate::services::Resolution;
use async_trait::async_trait;
use gengap_common::config::GenderizeConfig;
use gengap_common::db::Gender;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

pub const SOURCE_GENDERIZE: &str = "genderize";

/// Minimum service confidence for accepting a result. Bounds
/// false-positive gender assignment at the cost of coverage.
pub const PROBABILITY_THRESHOLD: f64 = 0.7;

/// Gender service client errors
#[derive(Debug, Error)]
pub enum GenderizeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Service response; empty gender means the service has no data
#[derive(Debug, Clone, Deserialize)]
struct GenderizeResponse {
    gender: Option<String>,
    probability: Option<f64>,
}

/// Rate limiter enforcing a minimum interval between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gender service API client
pub struct GenderizeClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: Arc<RateLimiter>,
}

impl GenderizeClient {
    pub fn new(config: &GenderizeConfig) -> Result<Self, GenderizeError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenderizeError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            rate_limiter: Arc::new(RateLimiter::new(config.min_interval_ms)),
        })
    }

    /// Look up one given name. Returns `None` when the service has no
    /// data or its confidence is below the acceptance threshold.
    pub async fn lookup(&self, name: &str) -> Result<Option<Resolution>, GenderizeError> {
        self.rate_limiter.wait().await;

        let mut request = self
            .http_client
            .get(&self.base_url)
            .query(&[("name", name)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        tracing::debug!(name = %name, "Querying gender service");

        let response = request
            .send()
            .await
            .map_err(|e| GenderizeError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 429 {
            return Err(GenderizeError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenderizeError::ApiError(status.as_u16(), error_text));
        }

        let payload: GenderizeResponse = response
            .json()
            .await
            .map_err(|e| GenderizeError::ParseError(e.to_string()))?;

        Ok(accept_response(&payload))
    }
}

/// Apply the acceptance threshold and convert the service's
/// probability-of-assigned-gender into P(female).
fn accept_response(payload: &GenderizeResponse) -> Option<Resolution> {
    let gender_label = payload.gender.as_deref()?;
    let probability = payload.probability.unwrap_or(0.0);
    if probability < PROBABILITY_THRESHOLD {
        return None;
    }

    let (gender, p_female) = match Gender::parse(gender_label) {
        Gender::Female => (Gender::Female, Some(probability)),
        Gender::Male => (Gender::Male, Some(1.0 - probability)),
        // Labels outside the binary vocabulary are preserved verbatim
        // but carry no P(female)
        Gender::Other(label) => (Gender::Other(label), None),
        Gender::Unknown => return None,
    };

    Some(Resolution {
        gender,
        p_female,
        source: Some(SOURCE_GENDERIZE.to_string()),
    })
}

#[async_trait]
impl NameResolver for GenderizeClient {
    fn id(&self) -> &'static str {
        SOURCE_GENDERIZE
    }

    async fn attempt(&self, name: &str) -> anyhow::Result<Option<Resolution>> {
        Ok(self.lookup(name).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_confident_female() {
        let payload = GenderizeResponse {
            gender: Some("female".to_string()),
            probability: Some(0.92),
        };
        let resolution = accept_response(&payload).unwrap();
        assert_eq!(resolution.gender, Gender::Female);
        assert_eq!(resolution.p_female, Some(0.92));
        assert_eq!(resolution.source.as_deref(), Some(SOURCE_GENDERIZE));
    }

    #[test]
    fn male_probability_is_inverted() {
        let payload = GenderizeResponse {
            gender: Some("male".to_string()),
            probability: Some(0.9),
        };
        let resolution = accept_response(&payload).unwrap();
        assert_eq!(resolution.gender, Gender::Male);
        let p = resolution.p_female.unwrap();
        assert!((p - 0.1).abs() < 1e-9);
    }

    #[test]
    fn rejects_below_threshold() {
        let payload = GenderizeResponse {
            gender: Some("female".to_string()),
            probability: Some(0.65),
        };
        assert!(accept_response(&payload).is_none());
    }

    #[test]
    fn rejects_empty_gender() {
        let payload = GenderizeResponse {
            gender: None,
            probability: Some(0.99),
        };
        assert!(accept_response(&payload).is_none());
    }

    #[test]
    fn nonbinary_label_preserved_without_probability() {
        let payload = GenderizeResponse {
            gender: Some("nonbinary".to_string()),
            probability: Some(0.8),
        };
        let resolution = accept_response(&payload).unwrap();
        assert_eq!(resolution.gender, Gender::Other("nonbinary".to_string()));
        assert_eq!(resolution.p_female, None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let payload = GenderizeResponse {
            gender: Some("female".to_string()),
            probability: Some(PROBABILITY_THRESHOLD),
        };
        assert!(accept_response(&payload).is_some());
    }

    #[tokio::test]
    async fn rate_limiter_timing() {
        let limiter = RateLimiter::new(100);

        let start = Instant::now();

        limiter.wait().await;
        let first_elapsed = start.elapsed();

        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(50));
        assert!(second_elapsed >= Duration::from_millis(90));
    }
}
