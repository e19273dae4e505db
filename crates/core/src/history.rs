//! Conversation history types.
//!
//! History is an append-only log of turns per (agent, sender) pair. Turns
//! are only ever removed in bulk: clear-history and retention cleanup.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use crate::message::Message;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(TurnRole::User),
            "assistant" => Some(TurnRole::Assistant),
            _ => None,
        }
    }
}

/// One persisted message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub agent_id: String,
    pub sender: String,
    /// Display name of the human side, as last reported by the transport
    pub sender_name: String,
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Transport-level message identifier, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ConversationTurn {
    pub fn new(
        agent_id: impl Into<String>,
        sender: impl Into<String>,
        sender_name: impl Into<String>,
        role: TurnRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            sender: sender.into(),
            sender_name: sender_name.into(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            message_id: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn user(
        agent_id: impl Into<String>,
        sender: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(agent_id, sender, sender_name, TurnRole::User, content)
    }

    pub fn assistant(
        agent_id: impl Into<String>,
        sender: impl Into<String>,
        sender_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(agent_id, sender, sender_name, TurnRole::Assistant, content)
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The prompt message replaying this turn.
    pub fn to_message(&self) -> Message {
        let mut msg = match self.role {
            TurnRole::User => Message::user(self.content.clone()),
            TurnRole::Assistant => Message::assistant(self.content.clone()),
        };
        msg.timestamp = self.timestamp;
        msg
    }
}

/// Per-sender rollup of one agent's conversations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub sender: String,
    /// Most recent display name seen for the sender
    pub sender_name: String,
    pub last_message: String,
    pub last_timestamp: DateTime<Utc>,
    pub message_count: usize,
}

/// Group turns by sender, most recently active sender first.
pub fn summarize_by_sender<'a, I>(turns: I) -> Vec<ConversationSummary>
where
    I: IntoIterator<Item = &'a ConversationTurn>,
{
    let mut by_sender: HashMap<&str, ConversationSummary> = HashMap::new();
    for turn in turns {
        let entry = by_sender
            .entry(turn.sender.as_str())
            .or_insert_with(|| ConversationSummary {
                sender: turn.sender.clone(),
                sender_name: turn.sender_name.clone(),
                last_message: turn.content.clone(),
                last_timestamp: turn.timestamp,
                message_count: 0,
            });
        entry.message_count += 1;
        if turn.timestamp >= entry.last_timestamp {
            entry.last_timestamp = turn.timestamp;
            entry.last_message = turn.content.clone();
            entry.sender_name = turn.sender_name.clone();
        }
    }

    let mut summaries: Vec<ConversationSummary> = by_sender.into_values().collect();
    sort_summaries(&mut summaries);
    summaries
}

/// Most recently active first; equal timestamps fall back to sender order.
pub fn sort_summaries(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| {
        b.last_timestamp
            .cmp(&a.last_timestamp)
            .then_with(|| a.sender.cmp(&b.sender))
    });
}

/// The instant before which turns fall outside a `days`-long retention
/// window. Windows reaching past the representable range clamp to
/// [`DateTime::<Utc>::MIN_UTC`], so nothing counts as expired.
pub fn retention_cutoff(days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
