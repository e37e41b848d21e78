//! Patient Recommender - personalized recommendations with rolling memory

pub mod config;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;

// Re-export for convenience
pub use services::llm_gateway_client::{LlmGateway, LlmGatewayClient};

// Re-export main types for convenience
pub use crate::config::Config;
pub use crate::models::internal::{
    HistoryEntry, IncomingRequest, Recommendation, RecommendationContext, RollupStatus,
    UserSession,
};
pub use crate::orchestrator::history::HistoryController;
pub use crate::orchestrator::{RecommendationError, RecommendationOrchestrator};
pub use crate::storage::db::init_db;
pub use crate::storage::history_store::{HistoryStore, InMemoryHistoryStore};
pub use crate::storage::repository::SeaOrmRecommendationRepository;
