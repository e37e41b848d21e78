use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{prelude::*, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::models::internal::{Feedback, RecommendationRow};
use crate::storage::entities::{feedback, recommendation_logs, recommendations};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DbError(#[from] sea_orm::DbErr),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

// ============================================
// SINK TRAITS
// ============================================

/// Append-only tabular log of recommendations.
#[async_trait]
pub trait TabularLogSink: Send + Sync {
    async fn append_row(&self, row: RecommendationRow) -> Result<(), StorageError>;
}

/// Durable, dated record of each recommendation.
#[async_trait]
pub trait DocumentStoreSink: Send + Sync {
    async fn insert(
        &self,
        date: DateTime<Utc>,
        user_id: &str,
        recommendation_text: &str,
    ) -> Result<(), StorageError>;
}

/// Therapist feedback on stored recommendations.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn append_feedback(&self, feedback: Feedback) -> Result<(), StorageError>;

    /// Most recent feedback on any of the user's recommendations, newest first.
    async fn recent_feedback_for_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> Result<Vec<String>, StorageError>;
}

// ============================================
// IMPLEMENTATION STRUCT
// ============================================
pub struct SeaOrmRecommendationRepository {
    db: DatabaseConnection,
}

impl SeaOrmRecommendationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_recommendation(
        &self,
        recommendation_id: Uuid,
    ) -> Result<Option<RecommendationRow>, StorageError> {
        let model = recommendations::Entity::find_by_id(recommendation_id.to_string())
            .one(&self.db)
            .await?;

        model.map(RecommendationRow::try_from).transpose()
    }

    pub async fn recommendations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<RecommendationRow>, StorageError> {
        let models = recommendations::Entity::find()
            .filter(recommendations::Column::UserId.eq(user_id))
            .order_by_asc(recommendations::Column::CreatedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(RecommendationRow::try_from).collect()
    }

    pub async fn count_documents(&self, user_id: &str) -> Result<u64, StorageError> {
        let count = recommendation_logs::Entity::find()
            .filter(recommendation_logs::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

impl TryFrom<recommendations::Model> for RecommendationRow {
    type Error = StorageError;

    fn try_from(m: recommendations::Model) -> Result<Self, Self::Error> {
        let recommendation_id = Uuid::parse_str(&m.recommendation_id).map_err(|e| {
            StorageError::InvalidInput(format!("bad recommendation_id {}: {}", m.recommendation_id, e))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&m.created_at)
            .map_err(|e| StorageError::InvalidInput(format!("bad created_at {}: {}", m.created_at, e)))?
            .with_timezone(&Utc);
        Ok(RecommendationRow {
            recommendation_id,
            user_id: m.user_id,
            user_profile: m.user_profile,
            recommendation: m.recommendation,
            created_at,
        })
    }
}

// ============================================
// TRAIT IMPLEMENTATIONS
// ============================================
#[async_trait]
impl TabularLogSink for SeaOrmRecommendationRepository {
    async fn append_row(&self, row: RecommendationRow) -> Result<(), StorageError> {
        let model = recommendations::ActiveModel {
            recommendation_id: Set(row.recommendation_id.to_string()),
            user_id: Set(row.user_id),
            user_profile: Set(row.user_profile),
            recommendation: Set(row.recommendation),
            created_at: Set(row.created_at.to_rfc3339()),
        };

        recommendations::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        tracing::debug!("Logged recommendation {}", row.recommendation_id);
        Ok(())
    }
}

#[async_trait]
impl DocumentStoreSink for SeaOrmRecommendationRepository {
    async fn insert(
        &self,
        date: DateTime<Utc>,
        user_id: &str,
        recommendation_text: &str,
    ) -> Result<(), StorageError> {
        let model = recommendation_logs::ActiveModel {
            date: Set(date.to_rfc3339()),
            user_id: Set(user_id.to_string()),
            recommendation: Set(recommendation_text.to_string()),
            ..Default::default()
        };

        recommendation_logs::Entity::insert(model).exec(&self.db).await?;
        tracing::debug!("Stored recommendation document for {}", user_id);
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for SeaOrmRecommendationRepository {
    async fn append_feedback(&self, entry: Feedback) -> Result<(), StorageError> {
        let model = feedback::ActiveModel {
            recommendation_id: Set(entry.recommendation_id.to_string()),
            therapist_id: Set(entry.therapist_id),
            feedback: Set(entry.feedback),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        feedback::Entity::insert(model).exec(&self.db).await?;
        tracing::info!("Stored feedback for recommendation {}", entry.recommendation_id);
        Ok(())
    }

    async fn recent_feedback_for_user(
        &self,
        user_id: &str,
        limit: u64,
    ) -> Result<Vec<String>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = recommendations::Entity::find()
            .filter(recommendations::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.recommendation_id)
            .collect();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let notes = feedback::Entity::find()
            .filter(feedback::Column::RecommendationId.is_in(ids))
            .order_by_desc(feedback::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(notes.into_iter().map(|m| m.feedback).collect())
    }
}
