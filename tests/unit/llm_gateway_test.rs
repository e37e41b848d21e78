use super::test_settings;
use patient_recommender::services::llm_gateway_client::{
    GatewayError, GenerationRequest, LlmGateway, LlmGatewayClient,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

fn client(server: &MockServer, api_key: Option<&str>) -> LlmGatewayClient {
    LlmGatewayClient::with_options(
        format!("{}/", server.uri()),
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_generate_renders_prompt_and_sends_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "model": "unit-model",
            "max_tokens": 128,
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "Patient: Sam, {unknown} stays"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Try a quiet room.\n")))
        .expect(1)
        .mount(&server)
        .await;

    let mut vars = BTreeMap::new();
    vars.insert("name".to_string(), "Sam".to_string());
    let request =
        GenerationRequest::new("Patient: {name}, {unknown} stays", "be brief", test_settings())
            .with_vars(vars);

    let text = client(&server, Some("secret")).generate(request).await.unwrap();
    assert_eq!(text, "Try a quiet room.");
}

#[tokio::test]
async fn test_generate_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let result = client(&server, None)
        .generate(GenerationRequest::new("hi", "sys", test_settings()))
        .await;

    match result {
        Err(GatewayError::ApiError { status, message }) => {
            assert_eq!(status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_blank_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&server)
        .await;

    let result = client(&server, None)
        .generate(GenerationRequest::new("hi", "sys", test_settings()))
        .await;

    assert!(matches!(result, Err(GatewayError::EmptyResponse(model)) if model == "unit-model"));
}

#[tokio::test]
async fn test_generate_without_choices_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let result = client(&server, None)
        .generate(GenerationRequest::new("hi", "sys", test_settings()))
        .await;

    assert!(matches!(result, Err(GatewayError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_health_check_and_list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"id": "llama-3.3-70b-versatile"}, {"id": "mixtral"}]
        })))
        .mount(&server)
        .await;

    let client = client(&server, None);
    assert!(client.health_check().await.unwrap());
    assert_eq!(
        client.list_models().await.unwrap(),
        vec!["llama-3.3-70b-versatile", "mixtral"]
    );
}

#[tokio::test]
async fn test_health_check_reports_unhealthy_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server, None);
    assert!(!client.health_check().await.unwrap());
    assert!(client.list_models().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_gateway_is_http_error() {
    let client =
        LlmGatewayClient::with_options("http://127.0.0.1:1".to_string(), None, Duration::from_secs(2))
            .unwrap();
    let result = client
        .generate(GenerationRequest::new("hi", "sys", test_settings()))
        .await;
    assert!(matches!(result, Err(GatewayError::HttpError(_))));
}
