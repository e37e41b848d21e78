use super::{test_settings, MockGateway};
use patient_recommender::services::classifier::{
    Classifier, ClassifierKind, EnrichmentError, LlmClassifier,
};
use patient_recommender::services::llm_gateway_client::GatewayError;
use std::sync::Arc;

fn classifier(kind: ClassifierKind, answer: &'static str) -> LlmClassifier {
    let mut gateway = MockGateway::new();
    gateway
        .expect_generate()
        .withf(|request| request.prompt.contains("Given"))
        .times(1)
        .returning(move |_| Ok(answer.to_string()));
    LlmClassifier::new(kind, Arc::new(gateway), test_settings())
}

#[tokio::test]
async fn test_sentiment_label_from_fenced_output() {
    let sentiment = classifier(
        ClassifierKind::Sentiment,
        "Here you go:\n```json\n{\"sentiment\": \"Negative\"}\n```",
    );

    assert_eq!(sentiment.name(), "sentiment");
    assert_eq!(sentiment.analyze("I hate loud rooms").await.unwrap(), "Negative");
}

#[tokio::test]
async fn test_emotion_label() {
    let emotion = classifier(ClassifierKind::Emotion, "{\"emotion\": \"Anxious\"}");
    assert_eq!(emotion.analyze("worried about school").await.unwrap(), "Anxious");
}

#[tokio::test]
async fn test_behavior_keeps_whole_object() {
    let behavior = classifier(
        ClassifierKind::Behavior,
        r#"{"summary": "Covers ears in crowds", "patterns": ["avoidance"], "triggers": ["noise"]}"#,
    );

    let fact = behavior.analyze("profile").await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&fact).unwrap();
    assert_eq!(parsed["summary"], "Covers ears in crowds");
    assert_eq!(parsed["triggers"][0], "noise");
}

#[tokio::test]
async fn test_unparseable_output_is_parse_error() {
    let sentiment = classifier(ClassifierKind::Sentiment, "I think it is negative");
    assert!(matches!(
        sentiment.analyze("text").await,
        Err(EnrichmentError::Parse(_))
    ));
}

#[tokio::test]
async fn test_missing_label_is_parse_error() {
    let emotion = classifier(ClassifierKind::Emotion, "{\"sentiment\": \"Positive\"}");
    assert!(matches!(
        emotion.analyze("text").await,
        Err(EnrichmentError::Parse(_))
    ));
}

#[tokio::test]
async fn test_gateway_error_propagates() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_generate()
        .returning(|_| Err(GatewayError::InvalidResponse("bad".to_string())));
    let behavior = LlmClassifier::new(ClassifierKind::Behavior, Arc::new(gateway), test_settings());

    assert!(matches!(
        behavior.analyze("text").await,
        Err(EnrichmentError::Gateway(_))
    ));
}
