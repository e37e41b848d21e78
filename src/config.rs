use serde::Deserialize;
use validator::Validate;

use crate::orchestrator::history::DEFAULT_ROLLUP_THRESHOLD;

/// Main configuration for the recommender
#[derive(Debug, Deserialize, Validate, Clone)]
pub struct Config {
    /// Base URL of the OpenAI-compatible LLM gateway
    #[validate(url)]
    pub llm_base_url: String,

    /// Bearer token for the gateway, if it requires one
    pub llm_api_key: Option<String>,

    /// Model used for recommendations
    pub llm_model: String,

    /// Model used for history rollups and therapist feedback
    pub summarization_model: String,

    /// Model used for sentiment / emotion / behavior analysis
    pub classifier_model: String,

    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    #[validate(range(min = 1, max = 32768))]
    pub max_output_tokens: u32,

    /// Per-request HTTP timeout for gateway calls
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    /// Database URL (SeaORM / SQLite)
    pub database_url: String,

    /// Number of turns kept before the history collapses into a rollup
    #[validate(range(min = 1, max = 100))]
    pub rollup_threshold: usize,

    /// Whether the classifier fan-out runs before generation
    pub enrichment_enabled: bool,

    /// Upper bound for each enrichment call
    #[validate(range(min = 1, max = 300))]
    pub enrichment_timeout_secs: u64,

    /// Number of neighbours requested from the vector store
    #[validate(range(min = 1, max = 50))]
    pub similarity_k: u32,

    /// How many stored feedback notes are fed back into the prompt
    #[validate(range(max = 50))]
    pub feedback_history_limit: u64,

    /// Log level (e.g., info, debug, trace)
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::load_from(&format!("{}/.patient-recommender/config", home))
    }

    /// Loads defaults, then the optional file at `path` (extension inferred),
    /// then `RECOMMENDER__*` environment overrides.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("llm_base_url", "https://api.groq.com/openai/v1")?
            .set_default("llm_model", "llama-3.3-70b-versatile")?
            .set_default("summarization_model", "llama-3.3-70b-versatile")?
            .set_default("classifier_model", "llama-3.3-70b-versatile")?
            .set_default("temperature", 0.2)?
            .set_default("max_output_tokens", 1024u32)?
            .set_default("request_timeout_secs", 60u64)?
            .set_default("database_url", "sqlite://recommender.db")?
            .set_default("rollup_threshold", DEFAULT_ROLLUP_THRESHOLD as u64)?
            .set_default("enrichment_enabled", true)?
            .set_default("enrichment_timeout_secs", 30u64)?
            .set_default("similarity_k", 2u32)?
            .set_default("feedback_history_limit", 5u32)?
            .set_default("log_level", "info")?
            .add_source(config::File::with_name(path).required(false))
            // Environment overrides: RECOMMENDER__LLM_MODEL, RECOMMENDER__ROLLUP_THRESHOLD, etc.
            .add_source(config::Environment::with_prefix("RECOMMENDER").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// API key with blank values treated as absent
    pub fn effective_api_key(&self) -> Option<&str> {
        self.llm_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            model: self.llm_model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// Sampling parameters forwarded to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.2,
            max_output_tokens: 1024,
        }
    }
}
