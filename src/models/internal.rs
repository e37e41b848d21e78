use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One item of a user's conversation history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEntry {
    Turn {
        user_profile: String,
        recommendation: String,
    },
    Rollup {
        summarized_content: String,
    },
}

impl HistoryEntry {
    pub fn is_turn(&self) -> bool {
        matches!(self, HistoryEntry::Turn { .. })
    }
}

/// Per-user history state.
///
/// `turn_count` counts the Turn entries appended since the last rollup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserSession {
    pub entries: Vec<HistoryEntry>,
    pub turn_count: usize,
}

/// Context supplied to a single recommendation call.
///
/// Only `patient_profile` is required; the rest are enrichment signals that
/// fall back to a placeholder when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub patient_profile: String,
    #[serde(default)]
    pub retrieved_text: Option<String>,
    #[serde(default)]
    pub sentiment_analysis: Option<String>,
    #[serde(default)]
    pub emotional_state: Option<String>,
    #[serde(default)]
    pub behavioral_analysis: Option<String>,
    #[serde(default)]
    pub feedback_data: Option<String>,
}

impl RecommendationContext {
    pub fn new(patient_profile: impl Into<String>) -> Self {
        Self {
            patient_profile: patient_profile.into(),
            ..Default::default()
        }
    }
}

/// Outcome of the rollup check that follows every recorded turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollupStatus {
    NotDue,
    RolledUp,
    Failed { reason: String },
}

/// A successfully generated and persisted recommendation.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub recommendation_id: Uuid,
    pub user_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub rollup: RollupStatus,
}

/// Row of the tabular recommendation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendationRow {
    pub recommendation_id: Uuid,
    pub user_id: String,
    pub user_profile: String,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
}

/// Therapist feedback attached to a stored recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub recommendation_id: Uuid,
    pub therapist_id: String,
    pub feedback: String,
}

fn default_k() -> u32 {
    2
}

/// Structured patient request: journey maps plus identity fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRequest {
    pub user_id: String,
    pub user_name: String,
    pub user_age: u32,
    #[serde(default)]
    pub user_track_journey: Map<String, Value>,
    #[serde(default)]
    pub user_journey: Map<String, Value>,
    #[serde(default = "default_k")]
    pub k: u32,
}

impl PatientRequest {
    /// Merges both journeys with name and age into one profile object.
    /// Keys from `user_journey` win over `user_track_journey`.
    pub fn profile(&self) -> Value {
        let mut merged = self.user_track_journey.clone();
        for (key, value) in &self.user_journey {
            merged.insert(key.clone(), value.clone());
        }
        merged.insert("user_name".to_string(), Value::String(self.user_name.clone()));
        merged.insert("user_age".to_string(), Value::from(self.user_age));
        Value::Object(merged)
    }

    pub fn profile_text(&self) -> String {
        self.profile().to_string()
    }
}

/// Free-text request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub query: String,
    #[serde(default = "default_k")]
    pub k: u32,
}

/// Either request shape, as accepted by the batch input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncomingRequest {
    Patient(PatientRequest),
    Chat(ChatRequest),
}

impl IncomingRequest {
    pub fn user_id(&self) -> &str {
        match self {
            IncomingRequest::Patient(req) => &req.user_id,
            IncomingRequest::Chat(req) => &req.user_id,
        }
    }

    pub fn profile_text(&self) -> String {
        match self {
            IncomingRequest::Patient(req) => req.profile_text(),
            IncomingRequest::Chat(req) => req.query.clone(),
        }
    }

    pub fn k(&self) -> u32 {
        match self {
            IncomingRequest::Patient(req) => req.k,
            IncomingRequest::Chat(req) => req.k,
        }
    }
}
