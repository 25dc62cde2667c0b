//! Configuration loading for the gengap pipeline
//!
//! Values are resolved with environment variables taking priority over
//! the TOML config file, which takes priority over compiled defaults.
//! API keys are only ever read from the environment or the TOML file,
//! never stored in the database.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file location
pub const CONFIG_ENV: &str = "GENGAP_CONFIG";

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub genderize: GenderizeConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/gengap.db"),
        }
    }
}

/// Reference data supplied by external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Static name -> gender frequency table (TSV)
    pub name_dictionary: PathBuf,
    /// Journal ranking table with quartile tiers (CSV)
    pub journal_rankings: PathBuf,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            name_dictionary: PathBuf::from("data/name_gender.tsv"),
            journal_rankings: PathBuf::from("data/journal_rankings.csv"),
        }
    }
}

/// Probabilistic name-gender service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenderizeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Minimum interval between requests (client-side rate limit)
    pub min_interval_ms: u64,
    pub timeout_secs: u64,
    /// Number of in-flight service lookups
    pub lookup_concurrency: usize,
}

impl Default for GenderizeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.genderize.io".to_string(),
            api_key: None,
            min_interval_ms: 1000,
            timeout_secs: 30,
            lookup_concurrency: 4,
        }
    }
}

/// Batch text-classification backend settings (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Names per classification request (hard cap 100)
    pub batch_size: usize,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama-3.1-8b-instant".to_string(),
            batch_size: 100,
            max_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

/// Bootstrap estimation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub bootstrap_iterations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bootstrap_iterations: 1000,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an explicit path, `GENGAP_CONFIG`, or
    /// `gengap.toml` in the working directory. A missing file yields
    /// compiled defaults; a malformed file is a fatal config error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("gengap.toml"));

        let mut config = if resolved.exists() {
            let content = std::fs::read_to_string(&resolved)?;
            let config: PipelineConfig = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse {} failed: {}", resolved.display(), e)))?;
            info!("Loaded config from {}", resolved.display());
            config
        } else {
            info!("No config file at {}, using defaults", resolved.display());
            PipelineConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables take priority over TOML values.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("GENGAP_DB_PATH") {
            self.storage.db_path = PathBuf::from(path);
        }
        if let Ok(key) = std::env::var("GENGAP_GENDERIZE_API_KEY") {
            if self.genderize.api_key.is_some() {
                warn!("Genderize API key found in both environment and TOML; using environment");
            }
            self.genderize.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GENGAP_LLM_API_KEY") {
            if self.llm.api_key.is_some() {
                warn!("LLM API key found in both environment and TOML; using environment");
            }
            self.llm.api_key = Some(key);
        }
    }

    /// Fail fast when a command needs the name dictionary and it is absent.
    pub fn require_name_dictionary(&self) -> Result<&Path> {
        let path = self.reference.name_dictionary.as_path();
        if !path.exists() {
            return Err(Error::Config(format!(
                "Name dictionary not found: {}. Set [reference] name_dictionary in the config file.",
                path.display()
            )));
        }
        Ok(path)
    }

    /// Fail fast when a command needs the journal ranking table and it is absent.
    pub fn require_journal_rankings(&self) -> Result<&Path> {
        let path = self.reference.journal_rankings.as_path();
        if !path.exists() {
            return Err(Error::Config(format!(
                "Journal ranking table not found: {}. Set [reference] journal_rankings in the config file.",
                path.display()
            )));
        }
        Ok(path)
    }
}
