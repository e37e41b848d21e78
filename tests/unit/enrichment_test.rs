use async_trait::async_trait;
use patient_recommender::orchestrator::enrichment::{EnrichmentFacts, EnrichmentPipeline};
use patient_recommender::services::classifier::{
    Classifier, EnrichmentError, ScoredDocument, VectorStore,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct StubClassifier {
    name: &'static str,
    answer: Result<&'static str, &'static str>,
    delay: Duration,
}

impl StubClassifier {
    fn ok(name: &'static str, answer: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: Ok(answer),
            delay: Duration::ZERO,
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: Err("classifier offline"),
            delay: Duration::ZERO,
        })
    }

    fn slow(name: &'static str, answer: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: Ok(answer),
            delay,
        })
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn name(&self) -> &str {
        self.name
    }

    async fn analyze(&self, _text: &str) -> Result<String, EnrichmentError> {
        tokio::time::sleep(self.delay).await;
        self.answer
            .map(str::to_string)
            .map_err(|e| EnrichmentError::VectorStore(e.to_string()))
    }
}

struct StubStore {
    hits: Vec<ScoredDocument>,
    last_k: AtomicU32,
}

#[async_trait]
impl VectorStore for StubStore {
    async fn similarity_search(
        &self,
        _query: &str,
        k: u32,
    ) -> Result<Vec<ScoredDocument>, EnrichmentError> {
        self.last_k.store(k, Ordering::SeqCst);
        Ok(self.hits.iter().take(k as usize).cloned().collect())
    }
}

#[tokio::test]
async fn test_disabled_pipeline_yields_nothing() {
    let facts = EnrichmentPipeline::disabled().enrich("anything", 2).await;
    assert_eq!(facts, EnrichmentFacts::default());
}

#[tokio::test]
async fn test_all_signals_collected() {
    let store = Arc::new(StubStore {
        hits: vec![
            ScoredDocument {
                content: "Weighted blankets help sleep".to_string(),
                score: 0.91,
            },
            ScoredDocument {
                content: "Second best".to_string(),
                score: 0.5,
            },
        ],
        last_k: AtomicU32::new(0),
    });

    let pipeline = EnrichmentPipeline::new(Duration::from_secs(1))
        .with_sentiment(StubClassifier::ok("sentiment", "Negative"))
        .with_emotion(StubClassifier::ok("emotion", "Tired"))
        .with_behavior(StubClassifier::ok("behavior", "{\"summary\":\"restless\"}"))
        .with_vector_store(store.clone());

    let facts = pipeline.enrich("poor sleep", 3).await;

    assert_eq!(facts.sentiment.as_deref(), Some("Negative"));
    assert_eq!(facts.emotion.as_deref(), Some("Tired"));
    assert_eq!(facts.behavior.as_deref(), Some("{\"summary\":\"restless\"}"));
    assert_eq!(
        facts.retrieved_text.as_deref(),
        Some("Weighted blankets help sleep")
    );
    assert_eq!(store.last_k.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_classifier_degrades_to_none() {
    let pipeline = EnrichmentPipeline::new(Duration::from_secs(1))
        .with_sentiment(StubClassifier::failing("sentiment"))
        .with_emotion(StubClassifier::ok("emotion", "Calm"));

    let facts = pipeline.enrich("text", 2).await;

    assert_eq!(facts.sentiment, None);
    assert_eq!(facts.emotion.as_deref(), Some("Calm"));
    assert_eq!(facts.behavior, None);
}

#[tokio::test]
async fn test_slow_classifier_times_out() {
    let pipeline = EnrichmentPipeline::new(Duration::from_millis(50))
        .with_sentiment(StubClassifier::slow(
            "sentiment",
            "late",
            Duration::from_secs(5),
        ))
        .with_emotion(StubClassifier::ok("emotion", "Calm"));

    let facts = pipeline.enrich("text", 2).await;

    assert_eq!(facts.sentiment, None);
    assert_eq!(facts.emotion.as_deref(), Some("Calm"));
}

#[tokio::test]
async fn test_classifiers_run_concurrently() {
    let delay = Duration::from_millis(200);
    let pipeline = EnrichmentPipeline::new(Duration::from_secs(2))
        .with_sentiment(StubClassifier::slow("sentiment", "a", delay))
        .with_emotion(StubClassifier::slow("emotion", "b", delay))
        .with_behavior(StubClassifier::slow("behavior", "c", delay));

    let started = Instant::now();
    let facts = pipeline.enrich("text", 2).await;

    assert!(started.elapsed() < delay * 3);
    assert_eq!(facts.behavior.as_deref(), Some("c"));
}

#[tokio::test]
async fn test_empty_search_result_is_none() {
    let pipeline = EnrichmentPipeline::new(Duration::from_secs(1)).with_vector_store(Arc::new(
        StubStore {
            hits: vec![],
            last_k: AtomicU32::new(0),
        },
    ));

    assert_eq!(pipeline.enrich("text", 2).await.retrieved_text, None);
}

#[test]
fn test_facts_become_context() {
    let facts = EnrichmentFacts {
        sentiment: Some("Positive".to_string()),
        ..Default::default()
    };
    let context = facts.into_context("profile");

    assert_eq!(context.patient_profile, "profile");
    assert_eq!(context.sentiment_analysis.as_deref(), Some("Positive"));
    assert_eq!(context.feedback_data, None);
}
