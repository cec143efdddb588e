//! An inference client that replays scripted replies.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use switchboard_core::{LlmResponse, TokenUsage};
use switchboard_error::BackendError;
use switchboard_interface::{InferenceClient, PredictOptions};
use tokio::sync::mpsc;

/// Replays queued replies in order, then repeats the default reply.
///
/// Usage counts words: prompt words as prompt tokens, reply words as
/// completion tokens.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    default_reply: String,
    calls: Mutex<Vec<PredictOptions>>,
}

#[allow(dead_code)]
impl ScriptedClient {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            default_reply: default_reply.into(),
            ..Self::default()
        }
    }

    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    pub fn then_fail(self, error: BackendError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<PredictOptions> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, options: &PredictOptions) -> Result<LlmResponse, BackendError> {
        self.calls.lock().unwrap().push(options.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_reply.clone()))?;
        let usage = TokenUsage::new(
            options.prompt.split_whitespace().count() as u64,
            reply.split_whitespace().count() as u64,
        );
        Ok(LlmResponse::new(reply, usage))
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn predict(&self, options: &PredictOptions) -> Result<LlmResponse, BackendError> {
        self.next(options)
    }

    async fn predict_stream(
        &self,
        options: &PredictOptions,
        tokens: mpsc::Sender<String>,
    ) -> Result<LlmResponse, BackendError> {
        let response = self.next(options)?;
        for word in response.response.split_inclusive(' ') {
            if tokens.send(word.to_string()).await.is_err() {
                break;
            }
        }
        Ok(response)
    }

    async fn tokenize(&self, text: &str) -> Result<u64, BackendError> {
        Ok(text.split_whitespace().count() as u64)
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
