use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::models::internal::{HistoryEntry, UserSession};

/// Backing storage for per-user conversation history.
///
/// Implementations only need to make each call atomic on its own; sequencing
/// across calls for one user is the controller's job.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Snapshot of the user's session; default for an unseen user.
    async fn get(&self, user_id: &str) -> UserSession;

    /// Appends a Turn and returns the new `turn_count`.
    async fn record(&self, user_id: &str, user_profile: String, recommendation: String) -> usize;

    /// Replaces all entries with a single Rollup and resets `turn_count`.
    async fn rollup(&self, user_id: &str, summarized_content: String);
}

/// Process-lifetime map of sessions. Nothing is ever evicted.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    sessions: RwLock<HashMap<String, UserSession>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn get(&self, user_id: &str) -> UserSession {
        self.sessions
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn record(&self, user_id: &str, user_profile: String, recommendation: String) -> usize {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(user_id.to_string()).or_default();
        session.entries.push(HistoryEntry::Turn {
            user_profile,
            recommendation,
        });
        session.turn_count += 1;
        session.turn_count
    }

    async fn rollup(&self, user_id: &str, summarized_content: String) {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(user_id.to_string()).or_default();
        session.entries = vec![HistoryEntry::Rollup { summarized_content }];
        session.turn_count = 0;
    }
}
