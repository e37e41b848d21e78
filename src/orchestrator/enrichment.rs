use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::models::internal::RecommendationContext;
use crate::services::classifier::{Classifier, EnrichmentError, VectorStore};

/// Signals gathered before prompt construction. `None` means the signal was
/// not configured or its call failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentFacts {
    pub retrieved_text: Option<String>,
    pub sentiment: Option<String>,
    pub emotion: Option<String>,
    pub behavior: Option<String>,
}

impl EnrichmentFacts {
    pub fn into_context(self, patient_profile: impl Into<String>) -> RecommendationContext {
        RecommendationContext {
            patient_profile: patient_profile.into(),
            retrieved_text: self.retrieved_text,
            sentiment_analysis: self.sentiment,
            emotional_state: self.emotion,
            behavioral_analysis: self.behavior,
            feedback_data: None,
        }
    }
}

/// Concurrent fan-out over the independent enrichment collaborators.
///
/// Each call is bounded by `timeout`; failures degrade to `None` and never
/// fail the request.
pub struct EnrichmentPipeline {
    sentiment: Option<Arc<dyn Classifier>>,
    emotion: Option<Arc<dyn Classifier>>,
    behavior: Option<Arc<dyn Classifier>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    timeout: Duration,
}

impl EnrichmentPipeline {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sentiment: None,
            emotion: None,
            behavior: None,
            vector_store: None,
            timeout,
        }
    }

    /// Pipeline with nothing configured; every signal stays `None`.
    pub fn disabled() -> Self {
        Self::new(Duration::from_secs(1))
    }

    pub fn with_sentiment(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.sentiment = Some(classifier);
        self
    }

    pub fn with_emotion(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.emotion = Some(classifier);
        self
    }

    pub fn with_behavior(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.behavior = Some(classifier);
        self
    }

    pub fn with_vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    pub async fn enrich(&self, text: &str, k: u32) -> EnrichmentFacts {
        let (sentiment, emotion, behavior, retrieved_text) = tokio::join!(
            self.classify(self.sentiment.as_ref(), text),
            self.classify(self.emotion.as_ref(), text),
            self.classify(self.behavior.as_ref(), text),
            self.retrieve(text, k),
        );

        EnrichmentFacts {
            retrieved_text,
            sentiment,
            emotion,
            behavior,
        }
    }

    async fn classify(&self, classifier: Option<&Arc<dyn Classifier>>, text: &str) -> Option<String> {
        let classifier = classifier?;
        self.bounded(classifier.name(), classifier.analyze(text)).await
    }

    /// Content of the best hit, if any.
    async fn retrieve(&self, text: &str, k: u32) -> Option<String> {
        let store = self.vector_store.as_ref()?;
        let hits = self
            .bounded("similarity_search", store.similarity_search(text, k))
            .await?;
        hits.into_iter().next().map(|hit| hit.content)
    }

    async fn bounded<T, F>(&self, name: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, EnrichmentError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!("Enrichment {} failed, continuing without it: {}", name, e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Enrichment {} failed, continuing without it: {}",
                    name,
                    EnrichmentError::Timeout(self.timeout.as_secs())
                );
                None
            }
        }
    }
}
