//! Fact classifier backed by the Anthropic Messages API
//!
//! Implements the FactClassifier trait over HTTP. The endpoint, model,
//! and API key environment variable are configurable; responses must be
//! JSON matching the wire types in `classifier::types`, anything else is
//! a contract violation. No retries happen here: callers needing
//! resilience wrap these calls with their own policy.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info};

use crate::classifier::FactClassifier;
use crate::classifier::prompts::{CONSOLIDATION_PROMPT, EXTRACTION_PROMPT, candidate_context};
use crate::classifier::types::{ClassifierDecision, ClassifierError, ConversationTurn, Result};
use crate::config::ClassifierConfig;
use crate::memory::MemoryRecord;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Classifier calling the Anthropic Messages API
#[derive(Debug)]
pub struct AnthropicClassifier {
    client: Client,
    config: ClassifierConfig,
    api_key: String,
}

/// Messages API request body
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

/// Message in the request body
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Messages API response body
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Content block in the response; only text blocks carry text
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// JSON shape of the extraction response
#[derive(Debug, Deserialize)]
struct ExtractedFacts {
    facts: Vec<String>,
}

impl AnthropicClassifier {
    /// Create a new classifier with the given configuration
    ///
    /// Reads the API key from the environment variable named in
    /// config.api_key_env. Returns an error if the variable is not set.
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            ClassifierError::Config(format!("API key env var '{}' not set", config.api_key_env))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifierError::Api(e.to_string()))?;

        info!(
            "AnthropicClassifier initialized with model: {}, api_url: {}",
            config.model, config.api_url
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    /// Send one prompt and return the model's text output
    async fn call_api(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let url = format!("{}/v1/messages", self.config.api_url.trim_end_matches('/'));
        debug!("Calling Anthropic API at: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::Api(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClassifierError::Api(format!(
                "API returned {status}: {error_text}"
            )));
        }

        let completion: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Api(format!("Malformed API response: {e}")))?;

        completion
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| ClassifierError::Api("Empty response".to_string()))
    }
}

/// Strip a Markdown code fence if the model wrapped its JSON in one
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[async_trait]
impl FactClassifier for AnthropicClassifier {
    async fn extract_facts(&self, turn: &ConversationTurn) -> Result<Vec<String>> {
        let prompt = EXTRACTION_PROMPT
            .replace("{memories_text}", &turn.memories_text)
            .replace("{user_message}", &turn.user_message)
            .replace("{assistant_response}", &turn.assistant_response);

        let response = self.call_api(&prompt).await?;
        debug!("Extraction response: {}", response);

        let extracted: ExtractedFacts = serde_json::from_str(strip_code_fence(&response))
            .map_err(|e| {
                ClassifierError::ContractViolation(format!("Failed to parse extraction JSON: {e}"))
            })?;

        Ok(extracted.facts)
    }

    async fn classify_fact(
        &self,
        fact: &str,
        candidates: &[MemoryRecord],
    ) -> Result<ClassifierDecision> {
        let prompt = CONSOLIDATION_PROMPT
            .replace("{fact}", fact)
            .replace("{existing_memories}", &candidate_context(candidates));

        let response = self.call_api(&prompt).await?;
        debug!("Consolidation response: {}", response);

        serde_json::from_str(strip_code_fence(&response)).map_err(|e| {
            ClassifierError::ContractViolation(format!("Failed to parse decision JSON: {e}"))
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
