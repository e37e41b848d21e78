//! Per-user conversation history with a fixed-size rollup window.
//!
//! Each user's history grows by one Turn per recommendation. Once
//! `rollup_threshold` turns have accumulated since the last rollup, the
//! entries are summarized and replaced by a single Rollup entry.
//!
//! Mutations for one user are serialized through a per-user async mutex,
//! exposed as a [`TurnScope`]. Holding the scope across the whole
//! record-then-rollup sequence guarantees two concurrent requests cannot both
//! observe a full window and roll it up twice.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::internal::{HistoryEntry, UserSession};
use crate::orchestrator::summarizer::{HistorySummarizer, RollupError};
use crate::storage::history_store::HistoryStore;

pub const DEFAULT_ROLLUP_THRESHOLD: usize = 3;

pub struct HistoryController {
    store: Arc<dyn HistoryStore>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    rollup_threshold: usize,
}

impl HistoryController {
    pub fn new(store: Arc<dyn HistoryStore>, rollup_threshold: usize) -> Self {
        Self {
            store,
            user_locks: Mutex::new(HashMap::new()),
            rollup_threshold: rollup_threshold.max(1),
        }
    }

    pub fn rollup_threshold(&self) -> usize {
        self.rollup_threshold
    }

    /// Waits for exclusive access to `user_id`'s history.
    ///
    /// The lock is released when the returned scope is dropped, on every path.
    pub async fn lock_user(&self, user_id: &str) -> TurnScope<'_> {
        let user_lock = {
            let mut locks = self.user_locks.lock().await;
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        TurnScope {
            controller: self,
            user_id: user_id.to_string(),
            _guard: user_lock.lock_owned().await,
        }
    }

    /// Current entries, oldest first. Empty for an unseen user.
    pub async fn get_history(&self, user_id: &str) -> Vec<HistoryEntry> {
        self.store.get(user_id).await.entries
    }

    pub async fn session(&self, user_id: &str) -> UserSession {
        self.store.get(user_id).await
    }

    /// Records one turn under the user's lock. See [`TurnScope::record_turn`].
    pub async fn record_turn(
        &self,
        user_id: &str,
        user_profile: &str,
        recommendation_text: &str,
    ) -> bool {
        self.lock_user(user_id)
            .await
            .record_turn(user_profile, recommendation_text)
            .await
    }

    /// Runs the rollup check under the user's lock. See [`TurnScope::maybe_rollup`].
    pub async fn maybe_rollup(
        &self,
        user_id: &str,
        summarizer: &dyn HistorySummarizer,
    ) -> Result<bool, RollupError> {
        self.lock_user(user_id).await.maybe_rollup(summarizer).await
    }

    /// `record_turn` followed by `maybe_rollup` as one serialized sequence.
    pub async fn record_and_rollup(
        &self,
        user_id: &str,
        user_profile: &str,
        recommendation_text: &str,
        summarizer: &dyn HistorySummarizer,
    ) -> Result<bool, RollupError> {
        let scope = self.lock_user(user_id).await;
        if !scope.record_turn(user_profile, recommendation_text).await {
            return Ok(false);
        }
        scope.maybe_rollup(summarizer).await
    }
}

/// Exclusive access to one user's history.
pub struct TurnScope<'a> {
    controller: &'a HistoryController,
    user_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl TurnScope<'_> {
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.controller.get_history(&self.user_id).await
    }

    /// Appends a Turn. A blank recommendation is ignored and returns `false`;
    /// history must only ever hold real generated content.
    pub async fn record_turn(&self, user_profile: &str, recommendation_text: &str) -> bool {
        if recommendation_text.trim().is_empty() {
            tracing::debug!("Ignoring empty recommendation for user {}", self.user_id);
            return false;
        }

        let turn_count = self
            .controller
            .store
            .record(
                &self.user_id,
                user_profile.to_string(),
                recommendation_text.to_string(),
            )
            .await;
        tracing::debug!("User {} now has {} turns in window", self.user_id, turn_count);
        true
    }

    /// Collapses the window into one Rollup entry once it is full.
    ///
    /// Returns `Ok(true)` if a rollup happened, `Ok(false)` if the window is
    /// not full yet. On summarizer failure the entries and `turn_count` are
    /// left untouched, so the next recorded turn retries the rollup.
    pub async fn maybe_rollup(&self, summarizer: &dyn HistorySummarizer) -> Result<bool, RollupError> {
        let session = self.controller.store.get(&self.user_id).await;
        if session.turn_count < self.controller.rollup_threshold {
            return Ok(false);
        }

        let summary = match summarizer.summarize(&session.entries).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => {
                tracing::warn!("Empty rollup summary for user {}, keeping history", self.user_id);
                return Err(RollupError::EmptySummary);
            }
            Err(e) => {
                tracing::warn!("Rollup failed for user {}, keeping history: {}", self.user_id, e);
                return Err(e);
            }
        };

        self.controller.store.rollup(&self.user_id, summary).await;
        tracing::info!(
            "Rolled up {} entries for user {}",
            session.entries.len(),
            self.user_id
        );
        Ok(true)
    }
}
