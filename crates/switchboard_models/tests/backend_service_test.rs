//! Tests for the local backend service.

mod test_utils;

use std::sync::Arc;
use switchboard_core::{
    BackendConfig, Choice, GenerationRequest, LlmResponse, TokenUsage,
};
use switchboard_error::BackendError;
use switchboard_interface::{ChoiceMapper, InferenceInput, LlmBackend};
use switchboard_models::LocalBackendService;
use test_utils::ScriptedClient;

fn text_mapper() -> ChoiceMapper {
    Arc::new(|r: &LlmResponse| Choice::completion(0, r.response.clone()).with_finish_reason("stop"))
}

fn request() -> Arc<GenerationRequest> {
    Arc::new(
        GenerationRequest::builder()
            .model("m")
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn test_generate_text_runs_n_completions_into_one_bundle() {
    let client = ScriptedClient::new("unused")
        .then_reply("one two")
        .then_reply("three");
    let service = LocalBackendService::new(client);

    let mut config = BackendConfig::for_model("m");
    config.parameters.n = 2;

    let mut channels = service
        .generate_text(
            "a b c".to_string(),
            request(),
            Arc::new(config),
            text_mapper(),
            false,
            false,
        )
        .await
        .unwrap();
    assert!(channels.completions.is_none());
    assert!(channels.tokens.is_none());

    let bundle = channels.bundle.recv().await.unwrap().unwrap();
    assert_eq!(*bundle.usage(), TokenUsage::new(6, 3));
    let texts: Vec<_> = bundle.choices().iter().filter_map(Choice::content).collect();
    assert_eq!(texts, ["one two", "three"]);
    assert!(channels.bundle.recv().await.is_none());
}

#[tokio::test]
async fn test_generate_text_streams_tokens_in_order() {
    let service = LocalBackendService::new(ScriptedClient::new("hello brave new world"));

    let mut channels = service
        .generate_text(
            "hi".to_string(),
            request(),
            Arc::new(BackendConfig::for_model("m")),
            text_mapper(),
            true,
            true,
        )
        .await
        .unwrap();

    let mut tokens = channels.tokens.take().unwrap();
    let mut completions = channels.completions.take().unwrap();

    let collector = tokio::spawn(async move {
        let mut text = String::new();
        while let Some(token) = tokens.recv().await {
            text.push_str(&token.unwrap().response);
        }
        text
    });
    let completion = completions.recv().await.unwrap().unwrap();
    let bundle = channels.bundle.recv().await.unwrap().unwrap();

    assert_eq!(collector.await.unwrap(), "hello brave new world");
    assert_eq!(completion.response, "hello brave new world");
    assert_eq!(bundle.choices().len(), 1);
}

#[tokio::test]
async fn test_generate_text_applies_finetune_before_mapping() {
    let service = LocalBackendService::new(ScriptedClient::new("  reply</s>"));
    let mut config = BackendConfig::for_model("m");
    config.finetune.trim_suffix = vec!["</s>".to_string()];

    let mut channels = service
        .generate_text("p".into(), request(), Arc::new(config), text_mapper(), false, false)
        .await
        .unwrap();

    let bundle = channels.bundle.recv().await.unwrap().unwrap();
    assert_eq!(bundle.choices()[0].content(), Some("reply"));
}

#[tokio::test]
async fn test_generate_text_failure_arrives_as_err() {
    let client = ScriptedClient::new("unused").then_fail(BackendError::inference("model crashed"));
    let service = LocalBackendService::new(client);

    let mut channels = service
        .generate_text(
            "p".into(),
            request(),
            Arc::new(BackendConfig::for_model("m")),
            text_mapper(),
            false,
            false,
        )
        .await
        .unwrap();

    let err = channels.bundle.recv().await.unwrap().unwrap_err();
    assert!(err.to_string().contains("model crashed"));
}

#[tokio::test]
async fn test_cancelled_request_forwards_no_tokens() {
    let request = request();
    request.cancel();
    let service = LocalBackendService::new(ScriptedClient::new("a b c"));

    let mut channels = service
        .generate_text(
            "p".into(),
            Arc::clone(&request),
            Arc::new(BackendConfig::for_model("m")),
            text_mapper(),
            false,
            true,
        )
        .await
        .unwrap();

    let bundle = channels.bundle.recv().await.unwrap().unwrap();
    assert!(bundle.choices().is_empty());
    let mut tokens = channels.tokens.take().unwrap();
    assert!(tokens.recv().await.is_none());
}

#[tokio::test]
async fn test_inference_and_tokenize() {
    let service = LocalBackendService::new(ScriptedClient::new("free text"));
    let config = BackendConfig::for_model("m");

    let mut handle = service
        .inference(
            Default::default(),
            InferenceInput::text("why is the sky blue"),
            &config,
            false,
        )
        .await
        .unwrap();
    let response = handle.results.recv().await.unwrap().unwrap();
    assert_eq!(response.response, "free text");

    let mut handle = service
        .inference(
            Default::default(),
            InferenceInput::text("why is the sky blue"),
            &config,
            true,
        )
        .await
        .unwrap();
    let response = handle.results.recv().await.unwrap().unwrap();
    assert_eq!(response.usage, TokenUsage::new(5, 0));
    assert_eq!(service.client().calls().len(), 1);
}
