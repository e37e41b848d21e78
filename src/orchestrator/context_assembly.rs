//! Prompt assembly for a recommendation call.
//!
//! The template uses `{name}` placeholders. Every placeholder the template
//! references is always present in the variable map, with [`NO_DATA`] for
//! anything the caller did not supply, so rendering never fails.

use std::collections::BTreeMap;

use crate::models::internal::{HistoryEntry, RecommendationContext};

/// Placeholder for absent optional context.
pub const NO_DATA: &str = "No data available.";

pub const RECOMMENDATION_SYSTEM_PROMPT: &str = "You are a specialized healthcare AI assistant \
providing personalized recommendations for patients with sensory processing and behavioral needs.";

pub const RECOMMENDATION_TEMPLATE: &str = r#"You are a specialized neurological healthcare AI assistant providing personalized, refined recommendations and practical suggestions for patients with neurological conditions, including sensory processing, behavioral, and cognitive needs.

PATIENT PROFILE:
{patient_profile}

NEUROLOGICAL HISTORY & PREVIOUS RECOMMENDATIONS:
{patient_history}

CONTEXTUAL KNOWLEDGE BASE:
{retrieved_text}

SENTIMENT ANALYSIS:
{sentiment_analysis}

EMOTIONAL STATE DATA:
{emotional_state}

BEHAVIORAL ANALYSIS:
{behavioral_analysis}

PREVIOUS FEEDBACK & ITERATION (if available):
{feedback_data}

ANALYSIS FRAMEWORK:
1. Review the history and previous recommendations. Do not repeat what was already tried unless it needs adjustment.
2. Use the sentiment analysis to adapt tone and intervention strategy.
3. Use the emotional state data to identify regulation needs, intensity and triggers.
4. Use the behavioral analysis to understand patterns, antecedents and consequences.
5. If feedback is available, first explain which feedback you analyzed and how it changed the recommendations.

RECOMMENDATION GUIDELINES:
- Consider age, condition, cognitive function, interests, sensory sensitivities and therapy history.
- Use the contextual knowledge base where relevant.
- Keep recommendations developmentally appropriate, practical, and actionable by caregivers, teachers, therapists or neurologists.
- Prioritize emotional regulation, cognitive support and behavioral strategies.

RESPONSE FORMAT:
CLINICAL NEUROLOGICAL ASSESSMENT SUMMARY:
**Primary Neurological Concerns Identified:** top 3-5 priority areas.
**Strengths & Protective Factors:** existing strengths.
**Risk Factors & Triggers:** environmental, emotional, behavioral or neurological triggers.

RECOMMENDATIONS:
Tailored recommendations with a clear rationale. Prefix every recommendation adjusted because of therapist feedback with "**REFINED BASED ON FEEDBACK:**" and explain the adjustment.

If there is no usable patient profile, answer the message simply and do not mention that profile or history data is missing.
"#;

/// Renders history entries as plain text for a prompt.
pub fn render_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return NO_DATA.to_string();
    }

    let mut turn = 0;
    entries
        .iter()
        .map(|entry| match entry {
            HistoryEntry::Turn {
                user_profile,
                recommendation,
            } => {
                turn += 1;
                format!(
                    "Session {}:\nProfile: {}\nRecommendation: {}",
                    turn, user_profile, recommendation
                )
            }
            HistoryEntry::Rollup { summarized_content } => {
                format!("Summary of earlier sessions:\n{}", summarized_content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn or_no_data(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NO_DATA.to_string(),
    }
}

/// Builds the complete variable map for [`RECOMMENDATION_TEMPLATE`].
pub fn template_vars(
    context: &RecommendationContext,
    history: &[HistoryEntry],
) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert(
        "patient_profile".to_string(),
        or_no_data(Some(&context.patient_profile)),
    );
    vars.insert("patient_history".to_string(), render_history(history));
    vars.insert(
        "retrieved_text".to_string(),
        or_no_data(context.retrieved_text.as_deref()),
    );
    vars.insert(
        "sentiment_analysis".to_string(),
        or_no_data(context.sentiment_analysis.as_deref()),
    );
    vars.insert(
        "emotional_state".to_string(),
        or_no_data(context.emotional_state.as_deref()),
    );
    vars.insert(
        "behavioral_analysis".to_string(),
        or_no_data(context.behavioral_analysis.as_deref()),
    );
    vars.insert(
        "feedback_data".to_string(),
        or_no_data(context.feedback_data.as_deref()),
    );
    vars
}
