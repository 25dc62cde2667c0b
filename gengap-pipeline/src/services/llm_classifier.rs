//! Batch LLM classification tier
//!
//! Final inference tier for names left unresolved by the dictionary
//! and the probabilistic service. Names are submitted in batches to an
//! OpenAI-compatible chat-completions backend with an instruction to
//! return a JSON name -> label mapping; responses go through the parse
//! cascade in `response_parser`. The tier is rerunnable: a retry pass
//! re-submits only names that are still unresolved.

use crate::services::response_parser::parse_classifications;
use gengap_common::config::LlmConfig;
use gengap_common::db::Gender;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const SOURCE_LLM: &str = "llm";

/// Hard cap on names per request, independent of configuration
pub const MAX_BATCH_SIZE: usize = 100;

/// Batch classifier errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Response contained no completion text")]
    EmptyResponse,

    #[error("Response could not be parsed by any strategy")]
    Unparseable,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Batch name-gender classifier against a chat-completions backend
pub struct LlmClassifier {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    batch_size: usize,
}

impl LlmClassifier {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Classify one batch of names. The returned mapping may cover
    /// fewer names than were submitted; callers match by name.
    pub async fn classify_batch(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, Gender>, LlmError> {
        debug_assert!(names.len() <= MAX_BATCH_SIZE);

        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(names),
            }],
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(count = names.len(), url = %url, "Submitting classification batch");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let payload: ChatResponse = response.json().await?;
        let content = payload
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or(LlmError::EmptyResponse)?;

        debug!(chars = content.len(), "Received classification response");

        parse_classifications(&content).ok_or(LlmError::Unparseable)
    }
}

/// Build the classification instruction for one batch.
fn build_prompt(names: &[String]) -> String {
    let example = if names.len() < 2 {
        r#"{"name": "male"}"#.to_string()
    } else {
        format!(r#"{{"{}": "male", "{}": "female"}}"#, names[0], names[1])
    };

    format!(
        "You are an expert at classifying names by gender. Analyze the following list of names \
         and classify each as either \"male\", \"female\", or \"unknown\" based on the name alone.\n\n\
         Return ONLY a valid JSON object where keys are the names and values are the gender \
         classification. Ensure all special characters in names are properly escaped.\n\n\
         Names to classify:\n{}\n\n\
         Response format (must be valid JSON with proper escaping):\n{}",
        serde_json::to_string(names).unwrap_or_default(),
        example
    )
}

/// P(female) assignment for a hard label from this tier
pub fn label_to_p_female(gender: &Gender) -> Option<f64> {
    match gender {
        Gender::Female => Some(1.0),
        Gender::Male => Some(0.0),
        Gender::Unknown | Gender::Other(_) => None,
    }
}
