// src/services/classifier.rs
//! Enrichment collaborators: text classifiers and similarity search.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::GenerationSettings;
use crate::services::json_extract::{extract_first_object, extract_label, JsonExtractError};
use crate::services::llm_gateway_client::{GatewayError, GenerationRequest, LlmGateway};

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Unparseable classifier output: {0}")]
    Parse(#[from] JsonExtractError),
    #[error("Vector store error: {0}")]
    VectorStore(String),
    #[error("Timed out after {0}s")]
    Timeout(u64),
}

/// Maps a piece of text to a small structured fact.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short name used in logs, e.g. "sentiment"
    fn name(&self) -> &str;

    async fn analyze(&self, text: &str) -> Result<String, EnrichmentError>;
}

/// A similarity-search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub content: String,
    pub score: f32,
}

/// Similarity search over the clinical knowledge base.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Best matches first; may be empty.
    async fn similarity_search(
        &self,
        query: &str,
        k: u32,
    ) -> Result<Vec<ScoredDocument>, EnrichmentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Sentiment,
    Emotion,
    Behavior,
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::Sentiment => "sentiment",
            ClassifierKind::Emotion => "emotion",
            ClassifierKind::Behavior => "behavior",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            ClassifierKind::Sentiment => "You are an expert at analyzing sentiment in user text.",
            ClassifierKind::Emotion => {
                "You are an expert in analyzing emotional states from user text."
            }
            ClassifierKind::Behavior => {
                "You are a clinical behavior analyst for patients with neurological conditions."
            }
        }
    }

    fn prompt(&self, text: &str) -> String {
        match self {
            ClassifierKind::Sentiment => format!(
                "Analyze the following text for sentiment.\n\
                 Only give a sentiment label like positive, negative, neutral, etc and no other information.\n\
                 For example\n\
                 {{\"sentiment\": \"Positive\"}}.\n\
                 Given text: {}\n\
                 Only give the json output and nothing else.",
                text
            ),
            ClassifierKind::Emotion => format!(
                "Analyze the following text for emotional states.\n\
                 Only give an emotion label like happy, sad, angry, anxious, calm, etc and no other information.\n\
                 For example\n\
                 {{\"emotion\": \"Happy\"}}.\n\
                 Given text: {}\n\
                 Only give the json output and nothing else.",
                text
            ),
            ClassifierKind::Behavior => format!(
                "Analyze the behavior described in the following patient data.\n\
                 Respond with a single json object with the keys \"summary\" (one paragraph), \
                 \"patterns\" (list of observed behavior patterns) and \"triggers\" (list of likely triggers).\n\
                 Given data: {}\n\
                 Only give the json output and nothing else.",
                text
            ),
        }
    }
}

/// Classifier backed by a gateway prompt whose answer is a JSON object.
pub struct LlmClassifier {
    kind: ClassifierKind,
    gateway: Arc<dyn LlmGateway>,
    settings: GenerationSettings,
}

impl LlmClassifier {
    pub fn new(
        kind: ClassifierKind,
        gateway: Arc<dyn LlmGateway>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            kind,
            gateway,
            settings,
        }
    }

    /// Turns raw model output into the fact placed in the prompt.
    ///
    /// Sentiment and emotion yield their label; behavior yields the whole
    /// object re-serialized compactly.
    pub fn parse_output(kind: ClassifierKind, raw: &str) -> Result<String, JsonExtractError> {
        match kind {
            ClassifierKind::Sentiment | ClassifierKind::Emotion => extract_label(raw, kind.name()),
            ClassifierKind::Behavior => {
                let object = extract_first_object(raw)?;
                if !object.contains_key("summary") {
                    return Err(JsonExtractError::Malformed(
                        "missing field `summary`".to_string(),
                    ));
                }
                Ok(serde_json::Value::Object(object).to_string())
            }
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn analyze(&self, text: &str) -> Result<String, EnrichmentError> {
        let request = GenerationRequest::new(
            self.kind.prompt(text),
            self.kind.system_prompt(),
            self.settings.clone(),
        );
        let raw = self.gateway.generate(request).await?;
        Ok(Self::parse_output(self.kind, &raw)?)
    }
}
