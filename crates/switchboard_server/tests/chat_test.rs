//! Chat orchestration tests, including the function-call protocol.

mod test_utils;

use serde_json::json;
use switchboard_core::{
    BackendConfig, ChatMessage, FunctionDefinition, GenerationRequest, ResponseFormat, ToolChoice,
};
use switchboard_error::{BackendError, SwitchboardErrorKind};
use switchboard_functions::JSON_BNF;
use switchboard_prompt::FileTemplates;
use switchboard_server::{ModelConfigLoader, StreamOptions, finish_reason_for};
use test_utils::{ScriptedClient, drain, service};

fn get_time() -> FunctionDefinition {
    FunctionDefinition::new("get_time")
        .with_description("Current time in a zone")
        .with_parameters(json!({
            "type": "object",
            "properties": {"zone": {"type": "string"}}
        }))
}

fn chat_request(functions: Vec<FunctionDefinition>) -> GenerationRequest {
    GenerationRequest::builder()
        .model("hermes")
        .messages(vec![ChatMessage::user("Hi")])
        .functions(functions)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_plain_chat_returns_one_assistant_message() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new().reply("Hello! How can I help?");
    let service = service(client.clone(), ModelConfigLoader::new(), FileTemplates::in_memory());

    let call = service.chat(chat_request(Vec::new()), StreamOptions::none()).await?;
    let trace = call.trace.clone();
    let items = drain(call.results).await;

    assert_eq!(items.len(), 1);
    let response = items[0].as_ref().unwrap();
    assert_eq!(response.id(), trace.id());
    assert_eq!(response.object(), "chat.completion");
    assert_eq!(response.choices().len(), 1);

    let message = response.choices()[0].message().as_ref().unwrap();
    assert_eq!(message.role.as_deref(), Some("assistant"));
    assert_eq!(message.content.as_deref(), Some("Hello! How can I help?"));
    assert_eq!(*response.usage().total_tokens(), 1 + 5);

    assert_eq!(client.calls().len(), 1);
    assert!(client.calls()[0].grammar.is_none());
    Ok(())
}

#[tokio::test]
async fn test_streamed_chat_emits_delta_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let service = service(
        ScriptedClient::new().reply("Hi there"),
        ModelConfigLoader::new(),
        FileTemplates::in_memory(),
    );
    let request = GenerationRequest::builder()
        .model("hermes")
        .messages(vec![ChatMessage::user("Hi")])
        .stream(true)
        .build()?;

    let mut call = service.chat(request, StreamOptions::tokens()).await?;
    let tokens = tokio::spawn(drain(call.tokens.take().unwrap()));
    let items = drain(call.results).await;

    assert_eq!(items.len(), 1);
    let chunk = items[0].as_ref().unwrap();
    assert_eq!(chunk.object(), "chat.completion.chunk");
    assert_eq!(chunk.choices()[0].content(), Some("Hi there"));
    assert!(chunk.choices()[0].delta().is_some());
    assert_eq!(tokens.await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_no_action_without_message_asks_backend_again() -> Result<(), Box<dyn std::error::Error>> {
    let loader = ModelConfigLoader::new();
    let mut config = BackendConfig::for_model("hermes");
    config.finetune.trim_suffix = vec!["<|end|>".to_string()];
    loader.register(config);

    let client = ScriptedClient::new()
        .reply(r#"{"function": "answer", "arguments": {"message": ""}}"#)
        .reply("It is noon.<|end|>");
    let service = service(client.clone(), loader, FileTemplates::in_memory());

    let call = service
        .chat(chat_request(vec![get_time()]), StreamOptions::none())
        .await?;
    let items = drain(call.results).await;

    assert_eq!(items.len(), 2);
    let opening = items[0].as_ref().unwrap();
    let delta = opening.choices()[0].delta().as_ref().unwrap();
    assert_eq!(delta.role.as_deref(), Some("assistant"));
    assert_eq!(delta.content.as_deref(), Some(""));

    let reply = items[1].as_ref().unwrap();
    assert_eq!(reply.object(), "chat.completion.chunk");
    assert_eq!(reply.choices()[0].content(), Some("It is noon."));

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].grammar.as_deref().is_some_and(|g| g.contains("answer")));
    assert!(calls[1].grammar.is_none());
    assert_eq!(calls[0].prompt, calls[1].prompt);
    Ok(())
}

#[tokio::test]
async fn test_no_action_with_message_is_used_directly() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new()
        .reply(r#"{"function": "answer", "arguments": {"message": "Hello there"}}"#);
    let service = service(client.clone(), ModelConfigLoader::new(), FileTemplates::in_memory());

    let call = service
        .chat(chat_request(vec![get_time()]), StreamOptions::none())
        .await?;
    let items = drain(call.results).await;

    assert_eq!(items.len(), 2);
    assert_eq!(
        items[1].as_ref().unwrap().choices()[0].content(),
        Some("Hello there")
    );
    assert_eq!(client.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_tool_call_emits_name_then_arguments() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new()
        .reply("{\"function\": \"get_time\", \"arguments\": {\"zone\": \"UTC\"}}");
    let service = service(client.clone(), ModelConfigLoader::new(), FileTemplates::in_memory());

    let call = service
        .chat(chat_request(vec![get_time()]), StreamOptions::none())
        .await?;
    let trace = call.trace.clone();
    let items = drain(call.results).await;

    assert_eq!(items.len(), 2);
    let first = items[0].as_ref().unwrap().choices()[0].delta().clone().unwrap();
    let second = items[1].as_ref().unwrap().choices()[0].delta().clone().unwrap();

    let named = &first.tool_calls[0];
    assert_eq!(named.index, 0);
    assert_eq!(&named.id, trace.id());
    assert_eq!(named.kind, "function");
    assert_eq!(named.function.name, "get_time");

    let with_arguments = &second.tool_calls[0];
    assert_eq!(with_arguments.index, 0);
    assert_eq!(&with_arguments.id, trace.id());
    assert_eq!(with_arguments.function.arguments, r#"{"zone":"UTC"}"#);

    assert_eq!(client.calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_parallel_calls_emit_two_chunks_each() -> Result<(), Box<dyn std::error::Error>> {
    let loader = ModelConfigLoader::new();
    let mut config = BackendConfig::for_model("hermes");
    config.function.parallel_calls = true;
    loader.register(config);

    let client = ScriptedClient::new().reply(
        r#"[{"function": "get_time", "arguments": {"zone": "UTC"}},
            {"function": "get_time", "arguments": {"zone": "CET"}}]"#,
    );
    let service = service(client, loader, FileTemplates::in_memory());

    let call = service
        .chat(chat_request(vec![get_time()]), StreamOptions::none())
        .await?;
    let items = drain(call.results).await;

    let indices: Vec<u32> = items
        .iter()
        .map(|item| {
            let response = item.as_ref().unwrap();
            response.choices()[0].delta().as_ref().unwrap().tool_calls[0].index
        })
        .collect();
    assert_eq!(indices, [0, 0, 1, 1]);
    Ok(())
}

#[tokio::test]
async fn test_unparseable_output_emits_no_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new().reply(r#"{"foo": "bar"}"#);
    let service = service(client, ModelConfigLoader::new(), FileTemplates::in_memory());

    let call = service
        .chat(chat_request(vec![get_time()]), StreamOptions::none())
        .await?;
    assert!(drain(call.results).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_multiline_string_arguments_are_parsed() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new()
        .reply("{\"function\": \"answer\", \"arguments\": {\"message\": \"line one\nline two\"}}");
    let service = service(client, ModelConfigLoader::new(), FileTemplates::in_memory());

    let call = service
        .chat(chat_request(vec![get_time()]), StreamOptions::none())
        .await?;
    let items = drain(call.results).await;

    assert_eq!(
        items[1].as_ref().unwrap().choices()[0].content(),
        Some("line one\nline two")
    );
    Ok(())
}

#[tokio::test]
async fn test_tool_choice_none_disables_functions() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new().reply("plain");
    let service = service(client.clone(), ModelConfigLoader::new(), FileTemplates::in_memory());

    let request = GenerationRequest::builder()
        .model("hermes")
        .messages(vec![ChatMessage::user("Hi")])
        .functions(vec![get_time()])
        .tool_choice(ToolChoice::None)
        .build()?;

    let call = service.chat(request, StreamOptions::none()).await?;
    let items = drain(call.results).await;

    assert_eq!(items[0].as_ref().unwrap().choices()[0].content(), Some("plain"));
    assert!(client.calls()[0].grammar.is_none());
    Ok(())
}

#[tokio::test]
async fn test_function_grammar_wins_over_json_object() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new().reply(r#"{"function": "answer", "arguments": {"message": "ok"}}"#);
    let service = service(client.clone(), ModelConfigLoader::new(), FileTemplates::in_memory());

    let request = GenerationRequest::builder()
        .model("hermes")
        .messages(vec![ChatMessage::user("Hi")])
        .functions(vec![get_time()])
        .response_format(Some(ResponseFormat::json_object()))
        .build()?;

    let call = service.chat(request, StreamOptions::none()).await?;
    drain(call.results).await;

    let grammar = client.calls()[0].grammar.clone().unwrap();
    assert_ne!(grammar, JSON_BNF);
    assert!(grammar.contains("get_time"));
    Ok(())
}

#[tokio::test]
async fn test_json_object_without_functions_uses_json_grammar() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new().reply("{}");
    let service = service(client.clone(), ModelConfigLoader::new(), FileTemplates::in_memory());

    let request = GenerationRequest::builder()
        .model("hermes")
        .messages(vec![ChatMessage::user("Hi")])
        .response_format(Some(ResponseFormat::json_object()))
        .build()?;

    let call = service.chat(request, StreamOptions::none()).await?;
    drain(call.results).await;

    assert_eq!(client.calls()[0].grammar.as_deref(), Some(JSON_BNF));
    Ok(())
}

#[tokio::test]
async fn test_pinned_unknown_function_fails_before_backend() {
    let client = ScriptedClient::new();
    let service = service(client.clone(), ModelConfigLoader::new(), FileTemplates::in_memory());

    let request = GenerationRequest::builder()
        .model("hermes")
        .messages(vec![ChatMessage::user("Hi")])
        .functions(vec![get_time()])
        .tool_choice(ToolChoice::Function("launch_rocket".into()))
        .build()
        .unwrap();

    let err = service
        .chat(request, StreamOptions::none())
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SwitchboardErrorKind::Grammar(_)));
    assert!(err.is_synchronous());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_generation_failure_is_delivered_as_err() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new().fail(BackendError::inference("model crashed"));
    let service = service(client, ModelConfigLoader::new(), FileTemplates::in_memory());

    let call = service.chat(chat_request(Vec::new()), StreamOptions::none()).await?;
    let items = drain(call.results).await;

    assert_eq!(items.len(), 1);
    let err = items[0].as_ref().unwrap_err();
    assert!(matches!(err.kind(), SwitchboardErrorKind::Backend(_)));
    Ok(())
}

#[tokio::test]
async fn test_cancelled_chat_closes_without_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new();
    let service = service(client, ModelConfigLoader::new(), FileTemplates::in_memory());
    let request = chat_request(Vec::new());
    request.clone().cancel();

    let call = service.chat(request, StreamOptions::none()).await?;
    assert!(drain(call.results).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_chat_cancelled_mid_stream_stops_tokens() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new()
        .reply("one two three four five")
        .token_delay(std::time::Duration::from_millis(50));
    let service = service(client, ModelConfigLoader::new(), FileTemplates::in_memory());
    let request = GenerationRequest::builder()
        .model("hermes")
        .messages(vec![ChatMessage::user("Count")])
        .stream(true)
        .build()?;
    let handle = request.clone();

    let mut call = service.chat(request, StreamOptions::tokens()).await?;
    let mut tokens = call.tokens.take().unwrap();

    let first = tokens.recv().await.unwrap()?;
    assert_eq!(first.response, "one ");
    handle.cancel();

    assert!(drain(tokens).await.is_empty());
    assert!(drain(call.results).await.is_empty());
    Ok(())
}

#[test]
fn test_finish_reason_for_tool_calls() {
    assert_eq!(finish_reason_for(true, true), "tool_calls");
    assert_eq!(finish_reason_for(false, false), "stop");
}
