use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use patient_recommender::{
    config::{Config, GenerationSettings},
    models::internal::IncomingRequest,
    orchestrator::{
        enrichment::EnrichmentPipeline,
        feedback::{FeedbackGenerator, DEFAULT_THERAPIST_ID},
        history::HistoryController,
        summarizer::LlmHistorySummarizer,
        RecommendationOrchestrator,
    },
    services::{ClassifierKind, LlmClassifier, LlmGateway, LlmGatewayClient},
    storage::{self, InMemoryHistoryStore, SeaOrmRecommendationRepository},
};

#[derive(Parser)]
#[command(name = "patient-recommender", version, about)]
struct Cli {
    /// Config file without extension (defaults to ~/.patient-recommender/config)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate recommendations for a JSON file of requests, in order
    Recommend {
        #[arg(long)]
        input: PathBuf,
    },
    /// Generate and store therapist feedback for a stored recommendation
    Feedback {
        #[arg(long)]
        recommendation_id: Uuid,
        #[arg(long, default_value = DEFAULT_THERAPIST_ID)]
        therapist_id: String,
    },
    /// Check that the LLM gateway is reachable
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load config
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("patient_recommender={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let gateway = Arc::new(LlmGatewayClient::with_options(
        config.llm_base_url.clone(),
        config.effective_api_key().map(str::to_string),
        Duration::from_secs(config.request_timeout_secs),
    )?);

    match cli.command {
        Command::Health => health(&gateway).await,
        Command::Recommend { input } => recommend(&config, gateway, input).await,
        Command::Feedback {
            recommendation_id,
            therapist_id,
        } => feedback(&config, gateway, recommendation_id, &therapist_id).await,
    }
}

async fn health(gateway: &LlmGatewayClient) -> anyhow::Result<()> {
    match gateway.health_check().await {
        Ok(true) => {
            tracing::info!("LLM gateway connected successfully");
            if let Ok(models) = gateway.list_models().await {
                tracing::info!("Gateway models: {}", models.join(", "));
            }
            Ok(())
        }
        Ok(false) => anyhow::bail!("LLM gateway health check returned an error status"),
        Err(e) => Err(e).context("LLM gateway not available"),
    }
}

fn model_settings(config: &Config, model: &str) -> GenerationSettings {
    GenerationSettings {
        model: model.to_string(),
        ..config.generation_settings()
    }
}

async fn recommend(
    config: &Config,
    gateway: Arc<LlmGatewayClient>,
    input: PathBuf,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("cannot read {}", input.display()))?;
    let requests = parse_requests(&raw)
        .with_context(|| format!("invalid request file {}", input.display()))?;

    let db = storage::init_db(&config.database_url).await?;
    let repository = Arc::new(SeaOrmRecommendationRepository::new(db));
    let gateway: Arc<dyn LlmGateway> = gateway;

    let history = Arc::new(HistoryController::new(
        Arc::new(InMemoryHistoryStore::new()),
        config.rollup_threshold,
    ));
    let summarizer = Arc::new(LlmHistorySummarizer::new(
        gateway.clone(),
        model_settings(config, &config.summarization_model),
    ));

    let mut enrichment = EnrichmentPipeline::new(Duration::from_secs(config.enrichment_timeout_secs));
    if config.enrichment_enabled {
        let classifier_settings = model_settings(config, &config.classifier_model);
        for kind in [
            ClassifierKind::Sentiment,
            ClassifierKind::Emotion,
            ClassifierKind::Behavior,
        ] {
            let classifier = Arc::new(LlmClassifier::new(
                kind,
                gateway.clone(),
                classifier_settings.clone(),
            ));
            enrichment = match kind {
                ClassifierKind::Sentiment => enrichment.with_sentiment(classifier),
                ClassifierKind::Emotion => enrichment.with_emotion(classifier),
                ClassifierKind::Behavior => enrichment.with_behavior(classifier),
            };
        }
    }

    let orchestrator = RecommendationOrchestrator::new(
        gateway,
        history,
        summarizer,
        repository.clone(),
        repository.clone(),
        config.generation_settings(),
    )
    .with_enrichment(enrichment)
    .with_feedback_store(repository, config.feedback_history_limit);

    let mut failures = 0;
    for request in &requests {
        match orchestrator.recommend_for_request(request).await {
            Ok(recommendation) => {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            }
            Err(e) => {
                failures += 1;
                tracing::error!("Recommendation for user {} failed: {}", request.user_id(), e);
            }
        }
    }

    tracing::info!(
        "Processed {} requests, {} failed",
        requests.len(),
        failures
    );
    if failures > 0 {
        anyhow::bail!("{} of {} requests failed", failures, requests.len());
    }
    Ok(())
}

/// A JSON array of requests, or one request object.
fn parse_requests(raw: &str) -> serde_json::Result<Vec<IncomingRequest>> {
    if raw.trim_start().starts_with('[') {
        serde_json::from_str(raw)
    } else {
        serde_json::from_str(raw).map(|request| vec![request])
    }
}

async fn feedback(
    config: &Config,
    gateway: Arc<LlmGatewayClient>,
    recommendation_id: Uuid,
    therapist_id: &str,
) -> anyhow::Result<()> {
    let db = storage::init_db(&config.database_url).await?;
    let repository = Arc::new(SeaOrmRecommendationRepository::new(db));

    let row = repository
        .find_recommendation(recommendation_id)
        .await?
        .with_context(|| format!("recommendation {} not found", recommendation_id))?;

    let generator = FeedbackGenerator::new(
        gateway,
        repository,
        model_settings(config, &config.summarization_model),
    );
    let feedback = generator
        .generate_feedback(recommendation_id, &row.recommendation, therapist_id)
        .await?;

    println!("{}", serde_json::to_string_pretty(&feedback)?);
    Ok(())
}
