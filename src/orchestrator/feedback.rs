use std::sync::Arc;
use uuid::Uuid;

use crate::config::GenerationSettings;
use crate::models::internal::Feedback;
use crate::services::llm_gateway_client::{GatewayError, GenerationRequest, LlmGateway};
use crate::storage::repository::{FeedbackStore, StorageError};

pub const DEFAULT_THERAPIST_ID: &str = "default_therapist";

const NO_FEEDBACK: &str = "No feedback provided.";

const FEEDBACK_SYSTEM_PROMPT: &str =
    "You are a therapist providing concise feedback on AI-generated recommendations for patients.";

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Simulated therapist review of a recommendation.
pub struct FeedbackGenerator {
    gateway: Arc<dyn LlmGateway>,
    store: Arc<dyn FeedbackStore>,
    settings: GenerationSettings,
}

impl FeedbackGenerator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        store: Arc<dyn FeedbackStore>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    /// Asks the gateway for feedback on `recommendation_text` and stores it
    /// against `recommendation_id`.
    ///
    /// An empty model answer is stored as "No feedback provided."; a gateway
    /// failure stores nothing.
    pub async fn generate_feedback(
        &self,
        recommendation_id: Uuid,
        recommendation_text: &str,
        therapist_id: &str,
    ) -> Result<Feedback, FeedbackError> {
        let prompt = format!(
            "Here is the recommendation:\n\n{}\n\n\
             Please provide constructive, practical, and brief feedback that a therapist \
             might record after reviewing this recommendation.",
            recommendation_text
        );

        let text = match self
            .gateway
            .generate(GenerationRequest::new(
                prompt,
                FEEDBACK_SYSTEM_PROMPT,
                self.settings.clone(),
            ))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) | Err(GatewayError::EmptyResponse(_)) => NO_FEEDBACK.to_string(),
            Err(e) => return Err(e.into()),
        };

        let feedback = Feedback {
            recommendation_id,
            therapist_id: therapist_id.to_string(),
            feedback: text,
        };
        self.store.append_feedback(feedback.clone()).await?;

        Ok(feedback)
    }
}
