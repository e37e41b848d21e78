use async_trait::async_trait;
use std::sync::Arc;

use crate::config::GenerationSettings;
use crate::models::internal::HistoryEntry;
use crate::orchestrator::context_assembly::render_history;
use crate::services::llm_gateway_client::{GatewayError, GenerationRequest, LlmGateway};

#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    #[error("Summarization failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Summarizer returned an empty summary")]
    EmptySummary,
}

/// Collapses a full history window into one summary text.
#[async_trait]
pub trait HistorySummarizer: Send + Sync {
    async fn summarize(&self, entries: &[HistoryEntry]) -> Result<String, RollupError>;
}

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a clinical assistant condensing a patient's recommendation history.";

pub struct LlmHistorySummarizer {
    gateway: Arc<dyn LlmGateway>,
    settings: GenerationSettings,
    max_words: u32,
}

impl LlmHistorySummarizer {
    pub fn new(gateway: Arc<dyn LlmGateway>, settings: GenerationSettings) -> Self {
        Self {
            gateway,
            settings,
            max_words: 300,
        }
    }

    pub fn with_max_words(mut self, max_words: u32) -> Self {
        self.max_words = max_words;
        self
    }

    fn build_prompt(&self, entries: &[HistoryEntry]) -> String {
        format!(
            "Summarize the following patient history in at most {} words. \
             Keep the patient profile facts, every recommendation that was made, \
             and anything marked as refined or ineffective, so later \
             recommendations can build on it without repeating it.\n\n{}",
            self.max_words,
            render_history(entries)
        )
    }
}

#[async_trait]
impl HistorySummarizer for LlmHistorySummarizer {
    async fn summarize(&self, entries: &[HistoryEntry]) -> Result<String, RollupError> {
        let request = GenerationRequest::new(
            self.build_prompt(entries),
            SUMMARY_SYSTEM_PROMPT,
            self.settings.clone(),
        );

        let summary = self.gateway.generate(request).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(RollupError::EmptySummary);
        }

        tracing::info!(
            "Summarized {} history entries: {}",
            entries.len(),
            summary.chars().take(50).collect::<String>()
        );
        Ok(summary.to_string())
    }
}
