mod common;

use applier_llm::cover_letter::{fallback_letter, CoverLetterGenerator, LlmCoverLetterWriter};
use applier_llm::openai::OpenAiClient;
use applier_llm::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gpt-4o-mini";

fn completion(text: &str) -> serde_json::Value {
    json!({
        "id": "resp_123",
        "object": "response",
        "created_at": 1_700_000_000,
        "status": "completed",
        "model": MODEL,
        "output": [{
            "id": "msg_1",
            "type": "message",
            "status": "completed",
            "content": [{ "type": "output_text", "text": text }]
        }],
        "usage": { "total_tokens": 42 }
    })
}

async fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new("sk-test".into(), MODEL.into())
        .expect("client")
        .with_base_url(format!("{}/v1", server.uri()))
        .with_retries(1)
}

#[tokio::test]
async fn generate_parses_output_text() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({ "model": MODEL, "max_output_tokens": 250 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Dear team,\nHire me.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let resp = client
        .generate("Write a letter", Some("You are a professional resume writer."), Some(250), Some(0.7))
        .await
        .expect("completion");

    assert_eq!(resp.text, "Dear team,\nHire me.");
    assert_eq!(resp.model.as_deref(), Some(MODEL));
    assert_eq!(resp.tokens_used, Some(42));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .generate("hi", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Api { status: 401, .. }));
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .await
        .generate("hi", None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Api { status: 503, .. }));
}

#[tokio::test]
async fn writer_returns_completion_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Dear Acme, ...")))
        .mount(&server)
        .await;

    let writer = LlmCoverLetterWriter::new(Arc::new(client_for(&server).await), "Sam Doe");
    let letter = writer
        .generate("Data Engineer", "Acme", "Build pipelines.", "Ten years of ETL.")
        .await;
    assert_eq!(letter, "Dear Acme, ...");

    let requests = server.received_requests().await.expect("recorded");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let input = body["input"].as_str().expect("input");
    assert!(input.contains("'Data Engineer' at 'Acme'"));
    assert!(input.contains("Ten years of ETL."));
}

#[tokio::test]
async fn writer_falls_back_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let writer = LlmCoverLetterWriter::new(Arc::new(client_for(&server).await), "Sam Doe");
    let letter = writer.generate("Data Engineer", "Acme", "", "").await;
    assert_eq!(letter, fallback_letter("Sam Doe"));
}

#[tokio::test]
async fn writer_falls_back_on_empty_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "model": MODEL, "output": [] })))
        .mount(&server)
        .await;

    let writer = LlmCoverLetterWriter::new(Arc::new(client_for(&server).await), "Sam Doe");
    assert_eq!(writer.generate("t", "c", "d", "b").await, fallback_letter("Sam Doe"));
}

struct SlowClient;

#[async_trait]
impl LlmClient for SlowClient {
    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> applier_llm::traits::Result<LlmResponse> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(LlmResponse {
            text: "too late".into(),
            model: None,
            tokens_used: None,
        })
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

#[tokio::test]
async fn writer_falls_back_on_timeout() {
    let writer = LlmCoverLetterWriter::new(Arc::new(SlowClient), "Sam Doe")
        .with_timeout(Duration::from_millis(20));
    assert_eq!(writer.generate("t", "c", "d", "b").await, fallback_letter("Sam Doe"));
}
