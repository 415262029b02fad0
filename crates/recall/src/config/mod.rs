use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{RecallError, Result};

/// Main configuration structure for Recall
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Memory store configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// LLM classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Consolidation tuning
    #[serde(default)]
    pub consolidator: ConsolidatorConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| RecallError::Config(format!("Failed to parse config: {e}")))
    }
}

/// Memory store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base directory for the LanceDB store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".recall"))
        .unwrap_or_else(|| PathBuf::from(".recall"))
}

/// LLM classifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// API endpoint URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Environment variable name for the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens per classifier response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    30
}

/// Consolidation tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ConsolidatorConfig {
    /// How many similar active records to offer the classifier per fact
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    /// How many memories the caller should render into chat context.
    /// Consumed by the embedding application, not by the library itself.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            candidate_limit: default_candidate_limit(),
            context_limit: default_context_limit(),
        }
    }
}

fn default_candidate_limit() -> usize {
    10
}

fn default_context_limit() -> usize {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.classifier.api_url, "https://api.anthropic.com");
        assert_eq!(config.classifier.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.classifier.model, "claude-sonnet-4-5");
        assert_eq!(config.classifier.max_tokens, 1024);
        assert_eq!(config.classifier.timeout_secs, 30);
        assert_eq!(config.consolidator.candidate_limit, 10);
        assert_eq!(config.consolidator.context_limit, 5);
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[storage]
data_dir = "/tmp/recall"

[classifier]
api_url = "https://llm.internal.example.com"
api_key_env = "LLM_API_KEY"
model = "claude-haiku-4-5"
max_tokens = 2048
timeout_secs = 60

[consolidator]
candidate_limit = 20
context_limit = 8
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/recall"));
        assert_eq!(config.classifier.api_url, "https://llm.internal.example.com");
        assert_eq!(config.classifier.api_key_env, "LLM_API_KEY");
        assert_eq!(config.classifier.model, "claude-haiku-4-5");
        assert_eq!(config.classifier.max_tokens, 2048);
        assert_eq!(config.classifier.timeout_secs, 60);
        assert_eq!(config.consolidator.candidate_limit, 20);
        assert_eq!(config.consolidator.context_limit, 8);
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[classifier]
model = "claude-opus-4-5"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse partial TOML");

        assert_eq!(config.classifier.model, "claude-opus-4-5");
        assert_eq!(config.classifier.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.consolidator.candidate_limit, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/recall.toml"));
        assert!(matches!(result, Err(RecallError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recall.toml");
        std::fs::write(&path, "[consolidator]\ncandidate_limit = 3\n").unwrap();

        let config = Config::load(&path).expect("Failed to load config");
        assert_eq!(config.consolidator.candidate_limit, 3);
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recall.toml");
        std::fs::write(&path, "[classifier\nbroken").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(RecallError::Config(_))));
    }
}
