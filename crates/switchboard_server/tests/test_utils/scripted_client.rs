//! An inference client that replays scripted replies.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use switchboard_core::{LlmResponse, TokenUsage};
use switchboard_error::BackendError;
use switchboard_interface::{InferenceClient, PredictOptions};
use tokio::sync::mpsc;

/// Replays queued replies in call order; without one, replies
/// `"reply to <prompt>"`.
///
/// Usage counts words: prompt words as prompt tokens, reply words as
/// completion tokens. Calls are recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    delays: Mutex<HashMap<String, Duration>>,
    token_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<PredictOptions>>,
}

#[allow(dead_code)]
impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, reply: impl Into<String>) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
        Arc::clone(self)
    }

    pub fn fail(self: &Arc<Self>, error: BackendError) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(Err(error));
        Arc::clone(self)
    }

    /// Holds the reply to `prompt` back for `delay`.
    pub fn delay(self: &Arc<Self>, prompt: impl Into<String>, delay: Duration) -> Arc<Self> {
        self.delays.lock().unwrap().insert(prompt.into(), delay);
        Arc::clone(self)
    }

    /// Pauses for `delay` after each streamed token.
    pub fn token_delay(self: &Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.token_delay.lock().unwrap() = Some(delay);
        Arc::clone(self)
    }

    pub fn calls(&self) -> Vec<PredictOptions> {
        self.calls.lock().unwrap().clone()
    }

    async fn next(&self, options: &PredictOptions) -> Result<LlmResponse, BackendError> {
        self.calls.lock().unwrap().push(options.clone());
        let delay = self.delays.lock().unwrap().get(&options.prompt).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.replies.lock().unwrap().pop_front();
        let reply = scripted.unwrap_or_else(|| Ok(format!("reply to {}", options.prompt)))?;
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
        self.next(options).await
    }

    async fn predict_stream(
        &self,
        options: &PredictOptions,
        tokens: mpsc::Sender<String>,
    ) -> Result<LlmResponse, BackendError> {
        let response = self.next(options).await?;
        let pause = *self.token_delay.lock().unwrap();
        for word in response.response.split_inclusive(' ') {
            if tokens.send(word.to_string()).await.is_err() {
                break;
            }
            if let Some(pause) = pause {
                tokio::time::sleep(pause).await;
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
