//! Shared test helpers for agent and router tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use switchboard_core::error::{ProviderError, StoreError};
use switchboard_core::history::{ConversationSummary, ConversationTurn};
use switchboard_core::message::{Message, MessageToolCall};
use switchboard_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use switchboard_core::store::HistoryStore;
use switchboard_core::tool::Tool;
use switchboard_core::ToolError;

/// A mock provider that returns a sequence of scripted responses and keeps
/// every request it was sent.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls),
            make_text_response(answer),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();
        if call >= responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }
        requests.push(request);
        Ok(responses[call].clone())
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::ApiError {
            status_code: 500,
            message: "upstream exploded".into(),
        })
    }
}

/// A provider that never answers within a test's timeout.
pub struct StalledProvider;

#[async_trait]
impl Provider for StalledProvider {
    fn name(&self) -> &str {
        "stalled_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(make_text_response("too late"))
    }
}

/// A provider that takes `delay` to answer and records how many calls it
/// was serving at once.
pub struct SlowProvider {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most calls observed in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(make_text_response("done"))
    }
}

/// A history store that cannot write but reads back nothing.
pub struct ReadOnlyHistory;

#[async_trait]
impl HistoryStore for ReadOnlyHistory {
    fn name(&self) -> &str {
        "read_only_mock"
    }

    async fn append(&self, _turn: &ConversationTurn) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn read_recent(&self, _: &str, _: &str, _: usize) -> Result<Vec<ConversationTurn>, StoreError> {
        Ok(Vec::new())
    }

    async fn clear(&self, _: &str, _: &str) -> Result<usize, StoreError> {
        Ok(0)
    }

    async fn aggregate_by_sender(&self, _: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        Ok(Vec::new())
    }

    async fn delete_older_than(&self, _: u32) -> Result<usize, StoreError> {
        Ok(0)
    }

    async fn count(&self, _: &str, _: &str) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// Echoes `{"y": x + 1}` for an integer `x`.
pub struct IncrementTool;

#[async_trait]
impl Tool for IncrementTool {
    fn name(&self) -> &str {
        "increment"
    }

    fn description(&self) -> &str {
        "Add one to x"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "x": { "type": "integer" } },
            "required": ["x"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let x = arguments["x"]
            .as_i64()
            .ok_or_else(|| ToolError::InvalidArguments("x must be an integer".into()))?;
        Ok(serde_json::json!({ "y": x + 1 }))
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: None,
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{}", name),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}
