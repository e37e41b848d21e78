pub mod db;
pub mod entities;
pub mod history_store;
pub mod repository;

pub use db::init_db;
pub use entities::{feedback, recommendation_logs, recommendations};
pub use history_store::{HistoryStore, InMemoryHistoryStore};
pub use repository::{
    DocumentStoreSink, FeedbackStore, SeaOrmRecommendationRepository, StorageError,
    TabularLogSink,
};
