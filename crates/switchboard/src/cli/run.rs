//! Request command handlers.

use super::{Cli, RequestArgs};
use anyhow::Context;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchboard_channels::ResultReceiver;
use switchboard_core::{GenerationRequest, Response, TemplateKind, Usage};
use switchboard_models::{LocalBackendService, OpenAICompatibleClient};
use switchboard_prompt::FileTemplates;
use switchboard_server::{
    GatewayConfig, ModelConfigLoader, OpenAIService, Orchestration, StreamOptions, finish_chunk,
    finish_reason_for,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Bearer token sent to the model server, when set.
const API_KEY_VAR: &str = "SWITCHBOARD_API_KEY";

/// Gateway settings with command-line overrides applied, plus the model
/// configurations found under the models directory.
#[derive(Debug)]
pub struct Gateway {
    backend_url: String,
    models_path: PathBuf,
    loader: Arc<ModelConfigLoader>,
}

impl Gateway {
    /// Loads settings and model configurations.
    #[instrument(skip_all)]
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let settings = GatewayConfig::load(cli.config.as_deref())?;
        let backend_url = cli
            .backend_url
            .clone()
            .unwrap_or_else(|| settings.backend_url().clone());
        let models_path = cli
            .models_path
            .clone()
            .unwrap_or_else(|| settings.models_path().clone());

        let loader = ModelConfigLoader::new().with_default_n(*settings.default_n());
        if models_path.is_dir() {
            let loaded = loader.load_from_path(&models_path)?;
            info!(count = loaded, path = %models_path.display(), "Loaded model configurations");
        } else {
            warn!(path = %models_path.display(), "Models directory not found; using defaults");
        }

        Ok(Self {
            backend_url,
            models_path,
            loader: Arc::new(loader),
        })
    }

    /// Builds an orchestration service talking to the model server as `model`.
    pub fn service_for(&self, model: &str) -> OpenAIService {
        let mut client =
            OpenAICompatibleClient::new(self.backend_url.clone(), model.to_string(), "local");
        if let Ok(key) = std::env::var(API_KEY_VAR) {
            client = client.with_api_key(key);
        }

        OpenAIService::new(
            Arc::new(LocalBackendService::new(client)),
            Arc::new(FileTemplates::new(self.models_path.clone())),
            self.loader.clone(),
        )
    }
}

fn read_request(path: Option<&Path>) -> anyhow::Result<GenerationRequest> {
    let body = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request {}", path.display()))?,
        _ => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request from stdin")?;
            body
        }
    };

    serde_json::from_str(&body).context("Request body is not a valid OpenAI request")
}

fn stream_options(args: &RequestArgs) -> StreamOptions {
    StreamOptions {
        notify_on_prompt_result: args.prompt_results,
        notify_on_token: args.stream,
    }
}

/// Prints every item of `rx` as a JSON line on stderr, tagged with `label`.
fn spawn_printer<T>(label: &'static str, mut rx: ResultReceiver<T>) -> JoinHandle<()>
where
    T: serde::Serialize + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            match item {
                Ok(value) => match serde_json::to_string(&value) {
                    Ok(json) => eprintln!("{label}: {json}"),
                    Err(e) => warn!(label, error = %e, "Failed to serialize"),
                },
                Err(e) => eprintln!("{label}: error: {e}"),
            }
        }
    })
}

/// Starts draining the side channels so the call can progress.
fn drain_side_channels(call: &mut Orchestration) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(mut tokens) = call.tokens.take() {
        handles.push(tokio::spawn(async move {
            let mut stdout = std::io::stdout();
            while let Some(token) = tokens.recv().await {
                match token {
                    Ok(token) => {
                        let _ = write!(stdout, "{}", token.response);
                        let _ = stdout.flush();
                    }
                    Err(e) => eprintln!("token: error: {e}"),
                }
            }
            let _ = writeln!(stdout);
        }));
    }
    if let Some(completions) = call.completions.take() {
        handles.push(spawn_printer("completion", completions));
    }
    for bundle in call.prompt_results.drain(..) {
        handles.push(spawn_printer("prompt", bundle));
    }

    handles
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Side channel printer failed");
        }
    }
}

/// Handles the `complete` and `edit` commands.
///
/// Prints the folded response as pretty JSON once every prompt has finished.
#[instrument(skip_all, fields(kind = %kind))]
pub async fn handle_prompt_command(
    gateway: &Gateway,
    kind: TemplateKind,
    args: &RequestArgs,
) -> anyhow::Result<()> {
    let request = read_request(args.request.as_deref())?;
    let service = gateway.service_for(request.model());

    let mut call = match kind {
        TemplateKind::Edit => service.edit(request, stream_options(args)).await?,
        _ => service.completion(request, stream_options(args)).await?,
    };
    debug!(trace_id = %call.trace, "Orchestration started");

    let printers = drain_side_channels(&mut call);
    let result = call.results.recv().await;
    join_all(printers).await;

    let response = result.context("Orchestration finished without a response")??;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Handles the `chat` command.
///
/// Each response is printed as one JSON line. A streamed chat ends with a
/// finish chunk whose reason reflects whether any tool was called.
#[instrument(skip_all)]
pub async fn handle_chat_command(gateway: &Gateway, args: &RequestArgs) -> anyhow::Result<()> {
    let request = read_request(args.request.as_deref())?;
    let service = gateway.service_for(request.model());
    let model = request.model().clone();
    let streaming = *request.stream();
    let uses_tools = *request.uses_tools();

    let mut call = service.chat(request, stream_options(args)).await?;
    debug!(trace_id = %call.trace, "Orchestration started");

    let printers = drain_side_channels(&mut call);
    let mut tools_called = false;
    let mut usage = Usage::default();
    let mut failure = None;

    while let Some(chunk) = call.results.recv().await {
        match chunk {
            Ok(chunk) => {
                tools_called |= called_tool(&chunk);
                if *chunk.usage().total_tokens() > 0 {
                    usage = *chunk.usage();
                }
                println!("{}", serde_json::to_string(&chunk)?);
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    drop(call.results);
    join_all(printers).await;

    if let Some(e) = failure {
        return Err(e.into());
    }

    if streaming {
        let reason = finish_reason_for(tools_called, uses_tools);
        let last = finish_chunk(&call.trace, &model, reason, usage);
        println!("{}", serde_json::to_string(&last)?);
    }
    Ok(())
}

fn called_tool(chunk: &Response) -> bool {
    chunk.choices().iter().any(|choice| {
        choice
            .delta()
            .as_ref()
            .or(choice.message().as_ref())
            .is_some_and(|m| !m.tool_calls.is_empty())
    })
}

/// Handles the `models` command.
pub fn handle_models_command(gateway: &Gateway) {
    for name in gateway.loader.list() {
        println!("{name}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::{Choice, FunctionCall, ObjectKind, ResponseMessage, ToolCall, TraceId};

    #[test]
    fn test_called_tool_detects_tool_call_deltas() {
        let trace = TraceId::with_id("t", 0);
        let plain = Response::new(&trace, "m", ObjectKind::ChatCompletionChunk)
            .with_choices(vec![Choice::chunk(0, ResponseMessage::content("hi"))]);
        assert!(!called_tool(&plain));

        let call = ToolCall::function(0, "t", FunctionCall::new("get_time", ""));
        let tool = Response::new(&trace, "m", ObjectKind::ChatCompletionChunk)
            .with_choices(vec![Choice::chunk(0, ResponseMessage::tool_call(call))]);
        assert!(called_tool(&tool));
    }

    #[test]
    fn test_stream_options_follow_flags() {
        let args = RequestArgs {
            request: None,
            stream: true,
            prompt_results: false,
        };
        let options = stream_options(&args);
        assert!(options.notify_on_token);
        assert!(!options.notify_on_prompt_result);
    }

    #[test]
    fn test_read_request_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let path = std::env::temp_dir().join(format!("switchboard-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"model":"llama","prompt":["Hello","World"]}"#)?;

        let request = read_request(Some(&path))?;
        std::fs::remove_file(&path)?;

        assert_eq!(request.model(), "llama");
        assert_eq!(request.prompts().len(), 2);
        Ok(())
    }
}
