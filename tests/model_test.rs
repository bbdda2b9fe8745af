//! Gemini client and semantic classifier against a mock HTTP server

use std::sync::Arc;

use mockito::Matcher;
use resource_directory::classifier::{Classifier, SemanticClassifier, FALLBACK_MESSAGE};
use resource_directory::model::{GeminiConfig, GeminiModel, LanguageModel};
use resource_directory::{Category, ClassificationResult};

fn model_for(server: &mockito::Server) -> GeminiModel {
    GeminiModel::new(&GeminiConfig {
        api_key: Some("test-key".to_string()),
        model: "gemini-flash-latest".to_string(),
        base_url: server.url(),
        timeout: None,
    })
    .unwrap()
}

fn reply_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_generate_sends_prompt_and_returns_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/gemini-flash-latest:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_body("hi there"))
        .create_async()
        .await;

    let text = model_for(&server).generate("hello").await.unwrap();

    assert_eq!(text, "hi there");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_generate_reports_http_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/gemini-flash-latest:generateContent")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let err = model_for(&server).generate("hello").await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_semantic_classifier_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/gemini-flash-latest:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_body(
            "```json\n{\"category\": \"Anxiety\", \"message\": \"It's okay to feel this way.\"}\n```",
        ))
        .create_async()
        .await;

    let classifier = SemanticClassifier::new(Arc::new(model_for(&server)));
    let result = classifier.classify("my heart races before exams").await;

    assert_eq!(
        result,
        ClassificationResult::resolved(Category::Anxiety, "It's okay to feel this way.")
    );
}

#[tokio::test]
async fn test_semantic_classifier_non_json_reply_falls_back() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/gemini-flash-latest:generateContent")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply_body("Sorry, I can only chat about the weather."))
        .create_async()
        .await;

    let classifier = SemanticClassifier::new(Arc::new(model_for(&server)));
    let result = classifier.classify("I feel anxious").await;

    assert_eq!(result, ClassificationResult::text_match(FALLBACK_MESSAGE));
}

#[tokio::test]
async fn test_unreachable_service_falls_back() {
    let model = GeminiModel::new(&GeminiConfig {
        api_key: Some("test-key".to_string()),
        base_url: "http://127.0.0.1:9".to_string(),
        ..Default::default()
    })
    .unwrap();

    let result = SemanticClassifier::new(Arc::new(model))
        .classify("I feel anxious")
        .await;

    assert!(!result.is_resolved());
    assert_eq!(result.message, FALLBACK_MESSAGE);
}
