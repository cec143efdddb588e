//! Mock server tests for the OpenAI-compatible inference client.

use serde_json::json;
use switchboard_error::BackendErrorKind;
use switchboard_interface::{InferenceClient, PredictOptions};
use switchboard_models::OpenAICompatibleClient;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenAICompatibleClient {
    OpenAICompatibleClient::new(server.uri(), "hermes".to_string(), "local")
}

fn options(prompt: &str) -> PredictOptions {
    PredictOptions {
        prompt: prompt.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_predict_sends_grammar_and_reads_usage() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(header("Authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "model": "hermes",
            "prompt": "Say hi",
            "grammar": "root ::= \"hi\"",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"text": "hi", "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 2, "completion_tokens": 1, "total_tokens": 3}
        })))
        .mount(&server)
        .await;

    let mut options = options("Say hi");
    options.grammar = Some("root ::= \"hi\"".to_string());

    let response = client(&server)
        .with_api_key("secret")
        .predict(&options)
        .await?;

    assert_eq!(response.response, "hi");
    assert_eq!(response.usage.prompt, 2);
    assert_eq!(response.usage.completion, 1);
    Ok(())
}

#[tokio::test]
async fn test_predict_maps_http_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&server)
        .await;

    let err = client(&server).predict(&options("x")).await.unwrap_err();
    assert_eq!(
        err.kind,
        BackendErrorKind::Http {
            status_code: 500,
            message: "model not loaded".to_string(),
        }
    );
    assert!(err.kind.is_retryable());
}

#[tokio::test]
async fn test_predict_without_choices_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server).predict(&options("x")).await.unwrap_err();
    assert!(matches!(err.kind, BackendErrorKind::ResponseParsing(_)));
}

#[tokio::test]
async fn test_predict_stream_forwards_each_piece() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;

    let sse = concat!(
        "data: {\"choices\":[{\"text\":\"Hel\"}]}\n\n",
        "data: {\"choices\":[{\"text\":\"lo\"}]}\n\n",
        "data: {\"choices\":[{\"text\":\"\",\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":4,\"completion_tokens\":2}}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(sse, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let (tx, mut rx) = mpsc::channel(8);
    let response = client(&server).predict_stream(&options("p"), tx).await?;

    let mut pieces = Vec::new();
    while let Some(piece) = rx.recv().await {
        pieces.push(piece);
    }

    assert_eq!(pieces, ["Hel", "lo"]);
    assert_eq!(response.response, "Hello");
    assert_eq!(response.usage.prompt, 4);
    assert_eq!(response.usage.completion, 2);
    Ok(())
}

#[tokio::test]
async fn test_predict_stream_tolerates_closed_receiver() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;

    let sse = concat!(
        "data: {\"choices\":[{\"text\":\"a\"}]}\n\n",
        "data: {\"choices\":[{\"text\":\"b\"}]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let response = client(&server).predict_stream(&options("p"), tx).await?;

    assert_eq!(response.response, "ab");
    assert_eq!(response.usage.completion, 2);
    Ok(())
}

#[tokio::test]
async fn test_tokenize_counts_tokens() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tokenize"))
        .and(body_partial_json(json!({"content": "why is the sky blue"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokens": [11, 22, 33, 44, 55]})))
        .mount(&server)
        .await;

    let count = client(&server).tokenize("why is the sky blue").await?;
    assert_eq!(count, 5);
    Ok(())
}
