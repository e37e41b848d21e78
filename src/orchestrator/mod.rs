pub mod context_assembly;
pub mod enrichment;
pub mod feedback;
pub mod history;
pub mod summarizer;

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::GenerationSettings;
use crate::models::internal::{
    IncomingRequest, Recommendation, RecommendationContext, RecommendationRow, RollupStatus,
};
use crate::services::llm_gateway_client::{GatewayError, GenerationRequest, LlmGateway};
use crate::storage::repository::{DocumentStoreSink, FeedbackStore, StorageError, TabularLogSink};

use context_assembly::{template_vars, RECOMMENDATION_SYSTEM_PROMPT, RECOMMENDATION_TEMPLATE};
use enrichment::EnrichmentPipeline;
use history::HistoryController;
use summarizer::HistorySummarizer;

/// Profile recorded when the caller supplied none.
const UNKNOWN_PROFILE: &str = "Unknown";

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("Gateway failure: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub struct RecommendationOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    history: Arc<HistoryController>,
    summarizer: Arc<dyn HistorySummarizer>,
    tabular_log: Arc<dyn TabularLogSink>,
    documents: Arc<dyn DocumentStoreSink>,
    feedback: Option<Arc<dyn FeedbackStore>>,
    feedback_history_limit: u64,
    enrichment: EnrichmentPipeline,
    settings: GenerationSettings,
}

impl RecommendationOrchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        history: Arc<HistoryController>,
        summarizer: Arc<dyn HistorySummarizer>,
        tabular_log: Arc<dyn TabularLogSink>,
        documents: Arc<dyn DocumentStoreSink>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            gateway,
            history,
            summarizer,
            tabular_log,
            documents,
            feedback: None,
            feedback_history_limit: 0,
            enrichment: EnrichmentPipeline::disabled(),
            settings,
        }
    }

    pub fn with_enrichment(mut self, enrichment: EnrichmentPipeline) -> Self {
        self.enrichment = enrichment;
        self
    }

    /// Feeds up to `limit` stored feedback notes into prompts that carry none.
    pub fn with_feedback_store(mut self, store: Arc<dyn FeedbackStore>, limit: u64) -> Self {
        self.feedback = Some(store);
        self.feedback_history_limit = limit;
        self
    }

    pub fn history(&self) -> &Arc<HistoryController> {
        &self.history
    }

    /// Enriches a raw request, then generates a recommendation for it.
    pub async fn recommend_for_request(
        &self,
        request: &IncomingRequest,
    ) -> Result<Recommendation, RecommendationError> {
        let profile = request.profile_text();
        tracing::info!("Payload for user {}: {}", request.user_id(), profile);

        let facts = self.enrichment.enrich(&profile, request.k()).await;
        tracing::debug!("Enrichment for user {}: {:?}", request.user_id(), facts);

        self.recommend(request.user_id(), facts.into_context(profile))
            .await
    }

    /// One recommendation turn for `user_id`.
    ///
    /// The whole sequence runs under the user's history lock: read history,
    /// generate, persist to both sinks, then record the turn and check for a
    /// rollup. Nothing is persisted or recorded if generation fails, and
    /// nothing is recorded if persistence fails. A failed rollup does not fail
    /// the call; it is reported in [`Recommendation::rollup`].
    pub async fn recommend(
        &self,
        user_id: &str,
        mut context: RecommendationContext,
    ) -> Result<Recommendation, RecommendationError> {
        if user_id.trim().is_empty() {
            return Err(RecommendationError::InvalidRequest(
                "user_id must not be empty".to_string(),
            ));
        }

        let scope = self.history.lock_user(user_id).await;
        let entries = scope.history().await;

        if context.feedback_data.is_none() {
            context.feedback_data = self.previous_feedback(user_id).await;
        }

        let request = GenerationRequest::new(
            RECOMMENDATION_TEMPLATE,
            RECOMMENDATION_SYSTEM_PROMPT,
            self.settings.clone(),
        )
        .with_vars(template_vars(&context, &entries));

        let text = match self.gateway.generate(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                return Err(GatewayError::EmptyResponse(self.settings.model.clone()).into());
            }
            Err(e) => {
                tracing::error!("Recommendation generation failed for user {}: {}", user_id, e);
                return Err(e.into());
            }
        };

        let recommendation_id = Uuid::new_v4();
        let created_at = Utc::now();
        let user_profile = if context.patient_profile.trim().is_empty() {
            UNKNOWN_PROFILE.to_string()
        } else {
            context.patient_profile.clone()
        };

        self.tabular_log
            .append_row(RecommendationRow {
                recommendation_id,
                user_id: user_id.to_string(),
                user_profile: user_profile.clone(),
                recommendation: text.clone(),
                created_at,
            })
            .await
            .inspect_err(|e| tracing::error!("Failed to log recommendation {}: {}", recommendation_id, e))?;

        self.documents
            .insert(created_at, user_id, &text)
            .await
            .inspect_err(|e| tracing::error!("Failed to store recommendation {}: {}", recommendation_id, e))?;

        tracing::info!("Persisted recommendation {} for user {}", recommendation_id, user_id);

        scope.record_turn(&user_profile, &text).await;
        let rollup = match scope.maybe_rollup(self.summarizer.as_ref()).await {
            Ok(true) => RollupStatus::RolledUp,
            Ok(false) => RollupStatus::NotDue,
            Err(e) => RollupStatus::Failed {
                reason: e.to_string(),
            },
        };

        Ok(Recommendation {
            recommendation_id,
            user_id: user_id.to_string(),
            text,
            created_at,
            rollup,
        })
    }

    async fn previous_feedback(&self, user_id: &str) -> Option<String> {
        let store = self.feedback.as_ref()?;
        match store
            .recent_feedback_for_user(user_id, self.feedback_history_limit)
            .await
        {
            Ok(notes) if !notes.is_empty() => Some(
                notes
                    .iter()
                    .map(|note| format!("- {}", note))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Could not load feedback for user {}: {}", user_id, e);
                None
            }
        }
    }
}
