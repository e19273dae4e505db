//! A single conversational agent and its message-handling protocol.
//!
//! For each inbound message the agent:
//!
//! 1. Records the user turn (best-effort)
//! 2. Reads the most recent turns for the (agent, sender) pair
//! 3. Builds the prompt: persona as the system message, then history
//! 4. Calls the model, offering the agent's enabled tools
//! 5. If the model asks for tools: runs them, then calls the model once more
//! 6. Records the assistant turn (best-effort) and returns the answer
//!
//! Storage and model failures in steps 2 to 5 fail the message. Nothing is
//! retried here.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::error::{Error, ProviderError, StoreError};
use switchboard_core::history::{ConversationSummary, ConversationTurn};
use switchboard_core::message::{Message, MessageToolCall};
use switchboard_core::profile::AgentProfile;
use switchboard_core::provider::{Provider, ProviderRequest, ToolChoice, ToolDefinition};
use switchboard_core::store::HistoryStore;
use switchboard_core::tool::{self, ToolRegistry};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Runtime knobs shared by every agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Number of history turns replayed into each prompt
    pub recent_limit: usize,

    /// Upper bound on each provider call and history read/append
    pub call_timeout: Option<Duration>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            recent_limit: 10,
            call_timeout: None,
        }
    }
}

/// One live agent, built from one [`AgentProfile`].
pub struct Agent {
    agent_id: String,
    profile: RwLock<AgentProfile>,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    history: Arc<dyn HistoryStore>,
    settings: AgentSettings,
}

impl Agent {
    pub fn new(
        profile: AgentProfile,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        history: Arc<dyn HistoryStore>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            agent_id: profile.agent_id.clone(),
            profile: RwLock::new(profile),
            provider,
            tools,
            history,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.agent_id
    }

    /// Snapshot of the cached profile.
    pub async fn profile(&self) -> AgentProfile {
        self.profile.read().await.clone()
    }

    /// Replace the cached profile after the store has been updated.
    ///
    /// The agent id never changes; a profile for another id is ignored.
    pub async fn set_profile(&self, profile: AgentProfile) {
        if profile.agent_id != self.agent_id {
            warn!(
                agent_id = %self.agent_id,
                other = %profile.agent_id,
                "Ignoring profile for a different agent"
            );
            return;
        }
        *self.profile.write().await = profile;
    }

    pub async fn is_assigned_to(&self, sender: &str) -> bool {
        self.profile.read().await.has_sender(sender)
    }

    /// Delete this agent's history with `sender`.
    pub async fn clear_history(&self, sender: &str) -> Result<usize, StoreError> {
        let removed = self.history.clear(&self.agent_id, sender).await?;
        info!(agent_id = %self.agent_id, sender = %sender, removed, "Cleared conversation history");
        Ok(removed)
    }

    /// Per-sender summaries of this agent's conversations.
    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, StoreError> {
        self.history.aggregate_by_sender(&self.agent_id).await
    }

    /// Handle one inbound message and return the reply text.
    pub async fn handle_message(
        &self,
        text: &str,
        sender: &str,
        sender_name: &str,
    ) -> Result<String, Error> {
        debug!(agent_id = %self.agent_id, sender = %sender, stage = "received", "Handling message");

        match self.respond(text, sender, sender_name).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                debug!(
                    agent_id = %self.agent_id,
                    sender = %sender,
                    stage = "failed",
                    error = %e,
                    "Message handling failed"
                );
                Err(e)
            }
        }
    }

    async fn respond(&self, text: &str, sender: &str, sender_name: &str) -> Result<String, Error> {
        let profile = self.profile().await;

        let logged = self
            .record(ConversationTurn::user(&self.agent_id, sender, sender_name, text))
            .await;
        debug!(agent_id = %self.agent_id, stage = "history_logged", logged, "Inbound turn recorded");

        let turns = self
            .bounded(
                self.history
                    .read_recent(&self.agent_id, sender, self.settings.recent_limit),
                StoreError::Timeout,
            )
            .await?;

        let mut messages = Vec::with_capacity(turns.len() + 2);
        messages.push(Message::system(&profile.system_prompt));
        messages.extend(turns.iter().map(ConversationTurn::to_message));
        if !logged {
            // The store never saw this message, so the read cannot contain it
            messages.push(Message::user(text));
        }

        let offered = if profile.wants_tools() {
            self.tools.definitions_for(&profile.enabled_tools)
        } else {
            Vec::new()
        };
        if offered.len() < profile.enabled_tools.len() && profile.tools_enabled {
            debug!(
                agent_id = %self.agent_id,
                enabled = profile.enabled_tools.len(),
                resolved = offered.len(),
                "Some enabled tools are not registered"
            );
        }
        debug!(
            agent_id = %self.agent_id,
            stage = "context_built",
            messages = messages.len(),
            tools = offered.len(),
            "Prompt assembled"
        );

        let tool_choice = if offered.is_empty() { None } else { Some(ToolChoice::Auto) };
        let request = ProviderRequest {
            model: profile.model.clone(),
            messages: messages.clone(),
            temperature: profile.temperature,
            max_tokens: Some(profile.max_tokens),
            tools: offered.clone(),
            tool_choice,
        };

        let response = self
            .bounded(self.provider.complete(request), ProviderError::Timeout)
            .await?;
        debug!(
            agent_id = %self.agent_id,
            stage = "model_called",
            model = %response.model,
            tool_calls = response.message.tool_calls.len(),
            "Model responded"
        );

        let answer = if response.message.has_tool_calls() {
            let calls = response.message.tool_calls.clone();
            debug!(
                agent_id = %self.agent_id,
                stage = "tools_requested",
                tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Model requested tools"
            );

            messages.push(response.message);
            for call in &calls {
                let result = self.run_tool(call, &offered).await;
                messages.push(Message::tool_result(&call.id, tool_result_text(&result)));
            }
            debug!(agent_id = %self.agent_id, stage = "tools_executed", count = calls.len(), "Tools executed");

            let follow_up = ProviderRequest {
                model: profile.model.clone(),
                messages,
                temperature: profile.temperature,
                max_tokens: Some(profile.max_tokens),
                tools: Vec::new(),
                tool_choice: None,
            };
            let second = self
                .bounded(self.provider.complete(follow_up), ProviderError::Timeout)
                .await?;
            debug!(agent_id = %self.agent_id, stage = "model_called_again", "Model answered tool results");

            if second.message.has_tool_calls() {
                warn!(
                    agent_id = %self.agent_id,
                    ignored = second.message.tool_calls.len(),
                    "Ignoring tool calls after the tool round trip"
                );
            }
            second.message.content
        } else {
            response.message.content
        };

        self.record(ConversationTurn::assistant(&self.agent_id, sender, sender_name, &answer))
            .await;

        debug!(
            agent_id = %self.agent_id,
            sender = %sender,
            stage = "answered",
            chars = answer.len(),
            "Reply ready"
        );
        Ok(answer)
    }

    /// Run one requested tool. Every failure becomes an error payload the
    /// model can read.
    async fn run_tool(&self, call: &MessageToolCall, offered: &[ToolDefinition]) -> Value {
        if !offered.iter().any(|d| d.name == call.name) {
            warn!(agent_id = %self.agent_id, tool = %call.name, "Model called a tool it was not offered");
            return tool::error_payload(format!("Tool {} is not available", call.name));
        }

        let arguments = if call.arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            match serde_json::from_str::<Value>(&call.arguments) {
                Ok(args) => args,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Unparseable tool arguments");
                    return tool::error_payload(format!(
                        "Invalid arguments for {}: {e}",
                        call.name
                    ));
                }
            }
        };

        debug!(agent_id = %self.agent_id, tool = %call.name, call_id = %call.id, "Executing tool");
        match self.tools.execute(&call.name, arguments).await {
            Ok(result) => result,
            Err(e) => tool::error_payload(e.to_string()),
        }
    }

    /// Append a turn, logging instead of failing. Returns whether it was stored.
    async fn record(&self, turn: ConversationTurn) -> bool {
        match self
            .bounded(self.history.append(&turn), StoreError::Timeout)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    agent_id = %self.agent_id,
                    sender = %turn.sender,
                    role = turn.role.as_str(),
                    error = %e,
                    "Failed to record conversation turn"
                );
                false
            }
        }
    }

    /// Apply the configured call timeout to `fut`.
    async fn bounded<T, E, F>(&self, fut: F, on_timeout: fn(String) -> E) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match self.settings.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout(format!("no response within {limit:?}"))),
            },
            None => fut.await,
        }
    }
}

fn tool_result_text(result: &Value) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| {
        serde_json::json!({ "error": true, "message": e.to_string() }).to_string()
    })
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("agent_id", &self.agent_id)
            .field("provider", &self.provider.name())
            .field("history", &self.history.name())
            .finish()
    }
}
