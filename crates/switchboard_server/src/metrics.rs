//! Metrics for orchestration calls.
//!
//! Provides OpenTelemetry-based counters and a latency histogram for the
//! Completion, Edit and Chat entry points.
//!
//! Available with the `metrics` feature.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use std::time::Duration;
use tracing::debug;

/// Orchestration metrics.
///
/// Available with the `metrics` feature.
#[derive(Clone)]
pub struct OrchestrationMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Orchestration calls per endpoint
    pub requests: Counter<u64>,
    /// Prompts fanned out to the backend
    pub prompts: Counter<u64>,
    /// Tool calls streamed to callers
    pub tool_calls: Counter<u64>,
    /// Chats answered through the no-action function
    pub no_action_replies: Counter<u64>,
    /// Errors delivered on result channels
    pub errors: Counter<u64>,
    /// Time from entry to final result in seconds
    pub duration: Histogram<f64>,
}

impl OrchestrationMetrics {
    /// Create new orchestration metrics.
    pub fn new() -> Self {
        let meter = global::meter("switchboard_orchestrator");

        let requests = meter
            .u64_counter("orchestrator.requests")
            .with_description("Orchestration calls per endpoint")
            .build();
        let prompts = meter
            .u64_counter("orchestrator.prompts")
            .with_description("Prompts fanned out to the backend")
            .build();
        let tool_calls = meter
            .u64_counter("orchestrator.tool_calls")
            .with_description("Tool calls streamed to callers")
            .build();
        let no_action_replies = meter
            .u64_counter("orchestrator.no_action_replies")
            .with_description("Chats answered through the no-action function")
            .build();
        let errors = meter
            .u64_counter("orchestrator.errors")
            .with_description("Errors delivered on result channels")
            .build();
        let duration = meter
            .f64_histogram("orchestrator.duration")
            .with_unit("seconds")
            .with_description("Time from entry to final result")
            .build();

        debug!("OrchestrationMetrics instruments created");
        Self {
            _meter: meter,
            requests,
            prompts,
            tool_calls,
            no_action_replies,
            errors,
            duration,
        }
    }

    /// Record an orchestration call and how many prompts it fans out to.
    pub fn record_request(&self, endpoint: &'static str, prompt_count: u64) {
        let labels = &[KeyValue::new("endpoint", endpoint)];
        self.requests.add(1, labels);
        self.prompts.add(prompt_count, labels);
    }

    /// Record tool calls emitted by a chat.
    pub fn record_tool_calls(&self, count: u64) {
        self.tool_calls.add(count, &[]);
    }

    /// Record a no-action reply.
    pub fn record_no_action(&self) {
        self.no_action_replies.add(1, &[]);
    }

    /// Record an error placed on a result channel.
    pub fn record_error(&self, endpoint: &'static str) {
        self.errors.add(1, &[KeyValue::new("endpoint", endpoint)]);
    }

    /// Record time to the final result.
    pub fn record_duration(&self, endpoint: &'static str, elapsed: Duration) {
        self.duration
            .record(elapsed.as_secs_f64(), &[KeyValue::new("endpoint", endpoint)]);
    }
}

impl Default for OrchestrationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrchestrationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationMetrics").finish_non_exhaustive()
    }
}
