//! gengap - authorship gender-gap analysis pipeline
//!
//! Batch CLI sequencing the pipeline stages: ingest publication
//! records, classify author given names through the layered chain,
//! retry leftovers against the batch LLM backend, attach journal
//! quartiles, and run the bootstrap analysis sweeps.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gengap_common::config::PipelineConfig;
use gengap_common::db::init_database;
use gengap_pipeline::records::read_records;
use gengap_pipeline::services::dictionary::NameDictionary;
use gengap_pipeline::services::gender_cache::GenderCache;
use gengap_pipeline::services::genderize_client::GenderizeClient;
use gengap_pipeline::services::inference::{GenderInferenceEngine, NameResolver};
use gengap_pipeline::services::journal_matcher::QuartileMatcher;
use gengap_pipeline::services::llm_classifier::LlmClassifier;
use gengap_pipeline::workflow;

/// Command-line arguments for gengap
#[derive(Parser, Debug)]
#[command(name = "gengap")]
#[command(about = "Authorship gender-gap analysis pipeline")]
#[command(version)]
struct Cli {
    /// Config file (TOML); defaults to gengap.toml if present
    #[arg(short, long, global = true, env = "GENGAP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest publication records from a JSONL file
    Ingest {
        /// Record file produced by the fetch collaborator
        #[arg(short, long)]
        input: PathBuf,

        /// Dataset tag for records that do not carry one
        #[arg(short, long)]
        dataset: Option<String>,
    },

    /// Classify unresolved author names (cache, dictionary, service)
    Infer,

    /// Re-submit still-unresolved names to the batch LLM classifier
    RetryLlm,

    /// Build the journal-quartile lookup and attach tiers
    MatchJournals {
        /// Ranking table (CSV); overrides the configured path
        #[arg(long)]
        rankings: Option<PathBuf>,
    },

    /// Run bootstrap sweeps and write CSV result tables
    Analyze {
        #[arg(long, default_value_t = 2015)]
        year_min: i64,

        #[arg(long, default_value_t = 2025)]
        year_max: i64,

        /// Output directory for result tables
        #[arg(short, long, default_value = "data/processed")]
        out: PathBuf,
    },

    /// Print storage counts and the gender breakdown
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gengap=info,gengap_pipeline=info,gengap_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let pool = init_database(&config.storage.db_path)
        .await
        .context("Failed to initialize database")?;

    match cli.command {
        Command::Ingest { input, dataset } => {
            let records = read_records(&input)?;
            let outcome =
                workflow::ingest::ingest_records(&pool, &records, dataset.as_deref()).await?;
            println!(
                "Ingested {} publications ({} author slots); {} records failed",
                outcome.ingested, outcome.link_rows, outcome.failed
            );
        }

        Command::Infer => {
            let dictionary = NameDictionary::load(config.require_name_dictionary()?)?;
            let genderize = GenderizeClient::new(&config.genderize)
                .context("Failed to create gender service client")?;
            let resolvers: Vec<Box<dyn NameResolver>> =
                vec![Box::new(dictionary), Box::new(genderize)];

            let cache = GenderCache::load(&pool).await?;
            let engine = GenderInferenceEngine::new(cache, resolvers);

            let outcome = workflow::inference::classify_authors(
                &pool,
                &engine,
                config.genderize.lookup_concurrency,
            )
            .await?;

            println!(
                "Classified {} candidate names ({} from cache, {} unresolved)",
                outcome.candidates, outcome.from_cache, outcome.unresolved
            );
            for (tier, count) in &outcome.by_source {
                println!("  {}: {} newly classified", tier, count);
            }
        }

        Command::RetryLlm => {
            let api_key = config.llm.api_key.clone().ok_or_else(|| {
                gengap_common::Error::Config(
                    "LLM API key not configured. Set GENGAP_LLM_API_KEY or [llm] api_key."
                        .to_string(),
                )
            })?;
            let classifier = LlmClassifier::new(&config.llm, api_key)
                .context("Failed to create batch classifier")?;
            let cache = GenderCache::load(&pool).await?;

            let outcome =
                workflow::inference::retry_unresolved_with_llm(&pool, &classifier, &cache).await?;
            println!(
                "Submitted {} names: {} resolved, {} remaining ({} failed batches)",
                outcome.submitted, outcome.resolved, outcome.remaining, outcome.failed_batches
            );
        }

        Command::MatchJournals { rankings } => {
            let rankings_path = match &rankings {
                Some(path) => path.as_path(),
                None => config.require_journal_rankings()?,
            };
            let matcher = QuartileMatcher::load(rankings_path)?;

            let outcome = workflow::journals::match_journal_quartiles(&pool, &matcher).await?;
            println!(
                "Matched {} of {} new journal names; {} publications carry a quartile tier",
                outcome.matched, outcome.vocabulary, outcome.publications_tagged
            );
        }

        Command::Analyze {
            year_min,
            year_max,
            out,
        } => {
            let outcome = workflow::analysis::run_analysis(
                &pool,
                year_min,
                year_max,
                config.analysis.bootstrap_iterations,
                &out,
            )
            .await?;
            println!(
                "Estimated {} groups ({} with insufficient data)",
                outcome.groups, outcome.insufficient_groups
            );
            for table in &outcome.tables {
                println!("  wrote {}", table.display());
            }
        }

        Command::Stats => {
            let summary = workflow::report::storage_summary(&pool).await?;
            println!("{}", summary);
        }
    }

    Ok(())
}
