//! Agent profiles: the durable description of one conversational agent.
//!
//! Personas are plain data: a single runtime agent type is parameterized
//! by an [`AgentProfile`]. New profiles are created from a [`NewAgent`]
//! request, with unspecified fields taken from [`ProfileDefaults`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::RouterError;

/// Durable record for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Globally unique, immutable identifier
    pub agent_id: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Persona / instructions sent as the system message
    pub system_prompt: String,

    pub model: String,

    /// Sampling temperature, 0.0..=1.0
    pub temperature: f32,

    /// Completion token cap, always positive
    pub max_tokens: u32,

    /// Master switch for tool use
    #[serde(default)]
    pub tools_enabled: bool,

    /// Tool names, in the order they are offered to the model
    #[serde(default)]
    pub enabled_tools: Vec<String>,

    /// Senders routed to this agent, in assignment order
    #[serde(default)]
    pub assigned_senders: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentProfile {
    /// Check the profile's invariants.
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.agent_id.trim().is_empty() {
            return Err(RouterError::Validation("agent_id must not be blank".into()));
        }
        if self.name.trim().is_empty() {
            return Err(RouterError::Validation("name must not be blank".into()));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(RouterError::Validation("system_prompt must not be blank".into()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RouterError::Validation(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(RouterError::Validation("max_tokens must be positive".into()));
        }
        Ok(())
    }

    pub fn has_sender(&self, sender: &str) -> bool {
        self.assigned_senders.iter().any(|s| s == sender)
    }

    /// Append a sender if absent. Returns whether the list changed.
    pub fn add_sender(&mut self, sender: &str) -> bool {
        if self.has_sender(sender) {
            return false;
        }
        self.assigned_senders.push(sender.to_string());
        self.updated_at = Utc::now();
        true
    }

    /// Remove a sender if present. Returns whether the list changed.
    pub fn remove_sender(&mut self, sender: &str) -> bool {
        let before = self.assigned_senders.len();
        self.assigned_senders.retain(|s| s != sender);
        let changed = self.assigned_senders.len() != before;
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Whether any tools should be considered for this agent at all.
    pub fn wants_tools(&self) -> bool {
        self.tools_enabled && !self.enabled_tools.is_empty()
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            agent_id: self.agent_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            assigned_senders: self.assigned_senders.clone(),
            enabled_tools: self.enabled_tools.clone(),
            tools_enabled: self.tools_enabled,
        }
    }
}

/// Model parameters applied when a create request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 800,
        }
    }
}

/// A request to create an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAgent {
    pub agent_id: String,
    pub name: String,
    pub system_prompt: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub tools_enabled: bool,
    #[serde(default)]
    pub enabled_tools: Vec<String>,
    #[serde(default)]
    pub assigned_senders: Vec<String>,
}

impl NewAgent {
    pub fn new(
        agent_id: impl Into<String>,
        name: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable tool use with the given tool names.
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools_enabled = true;
        self.enabled_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_senders<I, S>(mut self, senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assigned_senders = senders.into_iter().map(Into::into).collect();
        self
    }

    /// Materialize a profile, filling gaps from `defaults`.
    ///
    /// Sender and tool lists are de-duplicated keeping first occurrence.
    /// The result is not validated.
    pub fn into_profile(self, defaults: &ProfileDefaults) -> AgentProfile {
        let now = Utc::now();
        AgentProfile {
            agent_id: self.agent_id.trim().to_string(),
            name: self.name,
            description: self.description.unwrap_or_default(),
            system_prompt: self.system_prompt,
            model: self.model.unwrap_or_else(|| defaults.model.clone()),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            tools_enabled: self.tools_enabled,
            enabled_tools: dedup_ordered(self.enabled_tools),
            assigned_senders: dedup_ordered(
                self.assigned_senders.iter().map(|s| s.trim().to_string()).collect(),
            ),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update. `None` leaves the field unchanged.
///
/// Identity, creation time and sender assignments are not reachable from
/// here; senders change only through assign/unassign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub tools_enabled: Option<bool>,
    #[serde(default)]
    pub enabled_tools: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Produce the updated copy of `profile`.
    pub fn apply_to(&self, profile: &AgentProfile) -> AgentProfile {
        let mut updated = profile.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(prompt) = &self.system_prompt {
            updated.system_prompt = prompt.clone();
        }
        if let Some(model) = &self.model {
            updated.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            updated.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            updated.max_tokens = max_tokens;
        }
        if let Some(enabled) = self.tools_enabled {
            updated.tools_enabled = enabled;
        }
        if let Some(tools) = &self.enabled_tools {
            updated.enabled_tools = dedup_ordered(tools.clone());
        }
        updated.updated_at = Utc::now();
        updated
    }
}

/// Listing view of an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub assigned_senders: Vec<String>,
    pub enabled_tools: Vec<String>,
    pub tools_enabled: bool,
}

fn dedup_ordered(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
