//! The agent router: owns the live agents and picks one per sender.
//!
//! Routing is by explicit assignment. Agents are scanned in registration
//! order (store creation order) and the first one listing the sender wins.
//! Lifecycle operations write through to the [`ProfileStore`] while holding
//! the agent list's write lock, so readers never observe a half-applied
//! change.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use switchboard_config::{AppConfig, DEFAULT_APOLOGY, DEFAULT_PROTECTED_AGENTS};
use switchboard_core::error::{RouterError, StoreError};
use switchboard_core::history::ConversationSummary;
use switchboard_core::profile::{AgentProfile, AgentSummary, NewAgent, ProfileDefaults, ProfileUpdate};
use switchboard_core::provider::Provider;
use switchboard_core::store::{HistoryStore, ProfileStore};
use switchboard_core::tool::ToolRegistry;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::agent::{Agent, AgentSettings};
use crate::personas;

/// Router behaviour, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// The router's own transport address. `None` accepts every recipient.
    pub address: Option<String>,

    /// Agent ids that cannot be deleted
    pub protected_agents: Vec<String>,

    /// Agent answering senders nobody has claimed
    pub fallback_agent: Option<String>,

    /// Write missing built-in personas to the store during `initialize`
    pub bootstrap_builtins: bool,

    /// Handle at most one message at a time per sender
    pub serialize_per_sender: bool,

    /// Reply sent in place of an agent failure
    pub apology_message: String,

    pub profile_defaults: ProfileDefaults,

    pub agent: AgentSettings,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            address: None,
            protected_agents: DEFAULT_PROTECTED_AGENTS.iter().map(|s| s.to_string()).collect(),
            fallback_agent: None,
            bootstrap_builtins: false,
            serialize_per_sender: false,
            apology_message: DEFAULT_APOLOGY.to_string(),
            profile_defaults: ProfileDefaults::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl RouterSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            address: config.router.address.clone(),
            protected_agents: config.router.protected_agents.clone(),
            fallback_agent: config.router.fallback_agent.clone(),
            bootstrap_builtins: config.router.bootstrap_builtins,
            serialize_per_sender: config.router.serialize_per_sender,
            apology_message: config.router.apology_message.clone(),
            profile_defaults: config.agent_defaults.to_profile_defaults(),
            agent: AgentSettings {
                recent_limit: config.history.recent_limit,
                call_timeout: config.timeouts.call_secs.map(Duration::from_secs),
            },
        }
    }
}

/// Outcome of dispatching one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The message was addressed to someone else; nothing happened.
    Ignored,
    /// No agent claims the sender. The caller must not reply.
    NoAgent,
    /// Text to deliver back to the sender.
    Reply(String),
}

impl Dispatch {
    pub fn reply(&self) -> Option<&str> {
        match self {
            Dispatch::Reply(text) => Some(text),
            _ => None,
        }
    }
}

pub struct AgentRouter {
    profiles: Arc<dyn ProfileStore>,
    history: Arc<dyn HistoryStore>,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: RouterSettings,
    agents: RwLock<Vec<Arc<Agent>>>,
    initialized: AtomicBool,
    init_lock: Mutex<()>,
    sender_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentRouter {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        settings: RouterSettings,
    ) -> Self {
        Self {
            profiles,
            history,
            provider,
            tools,
            settings,
            agents: RwLock::new(Vec::new()),
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            sender_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Load every stored profile and build its agent. Returns the number of
    /// live agents. Calling it again is a no-op.
    pub async fn initialize(&self) -> Result<usize, RouterError> {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return Ok(self.agents.read().await.len());
        }

        if self.settings.bootstrap_builtins {
            self.bootstrap_builtins().await?;
        }

        let profiles = self.profiles.list_all().await?;
        let mut agents: Vec<Arc<Agent>> = Vec::with_capacity(profiles.len());
        for profile in profiles {
            if let Err(e) = profile.validate() {
                warn!(agent_id = %profile.agent_id, error = %e, "Skipping invalid agent profile");
                continue;
            }
            if agents.iter().any(|a| a.id() == profile.agent_id) {
                warn!(agent_id = %profile.agent_id, "Skipping duplicate agent profile");
                continue;
            }
            debug!(
                agent_id = %profile.agent_id,
                senders = profile.assigned_senders.len(),
                "Loaded agent"
            );
            agents.push(Arc::new(self.build_agent(profile)));
        }

        let count = agents.len();
        *self.agents.write().await = agents;
        self.initialized.store(true, Ordering::Release);
        info!(
            agents = count,
            store = self.profiles.name(),
            provider = self.provider.name(),
            "Agent router initialized"
        );
        Ok(count)
    }

    async fn bootstrap_builtins(&self) -> Result<(), RouterError> {
        for persona in personas::builtins() {
            if self.profiles.get(&persona.agent_id).await?.is_some() {
                continue;
            }
            let profile = persona.into_profile(&self.settings.profile_defaults);
            match self.profiles.create(&profile).await {
                Ok(()) => info!(agent_id = %profile.agent_id, "Created built-in agent"),
                Err(StoreError::Duplicate(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn build_agent(&self, profile: AgentProfile) -> Agent {
        Agent::new(
            profile,
            self.provider.clone(),
            self.tools.clone(),
            self.history.clone(),
            self.settings.agent.clone(),
        )
    }

    fn ensure_ready(&self) -> Result<(), RouterError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(RouterError::NotInitialized)
        }
    }

    /// Whether a message sent to `recipient` is meant for this router.
    pub fn is_addressed_to(&self, recipient: &str) -> bool {
        self.settings
            .address
            .as_deref()
            .is_none_or(|address| address == recipient)
    }

    /// The agent responsible for `sender`: the first assigned agent in
    /// registration order, else the fallback agent if one is configured.
    pub async fn select_agent(&self, sender: &str) -> Option<Arc<Agent>> {
        let sender = sender.trim();
        let agents = self.agents.read().await;
        for agent in agents.iter() {
            if agent.is_assigned_to(sender).await {
                return Some(agent.clone());
            }
        }

        let fallback = self.settings.fallback_agent.as_deref()?;
        let agent = agents.iter().find(|a| a.id() == fallback).cloned();
        if agent.is_none() {
            warn!(agent_id = %fallback, "Configured fallback agent is not live");
        }
        agent
    }

    /// Route one inbound message.
    ///
    /// Agent failures are logged and answered with the apology message; the
    /// only error is calling this before [`initialize`](Self::initialize).
    pub async fn dispatch(
        &self,
        message: &str,
        sender: &str,
        sender_name: &str,
        addressed_to_router: bool,
    ) -> Result<Dispatch, RouterError> {
        if !addressed_to_router {
            debug!(sender = %sender, "Message not addressed to the router, ignoring");
            return Ok(Dispatch::Ignored);
        }
        self.ensure_ready()?;

        let sender = sender.trim();
        let Some(agent) = self.select_agent(sender).await else {
            debug!(sender = %sender, "No agent assigned to sender");
            return Ok(Dispatch::NoAgent);
        };

        if !self.settings.serialize_per_sender {
            return Ok(self.run_turn(&agent, message, sender, sender_name).await);
        }

        let lock = self.sender_lock(sender).await;
        let reply = {
            let _turn = lock.lock().await;
            self.run_turn(&agent, message, sender, sender_name).await
        };
        self.release_sender_lock(sender, lock).await;
        Ok(reply)
    }

    async fn run_turn(&self, agent: &Agent, message: &str, sender: &str, sender_name: &str) -> Dispatch {
        info!(agent_id = %agent.id(), sender = %sender, "Dispatching message");
        match agent.handle_message(message, sender, sender_name).await {
            Ok(reply) => Dispatch::Reply(reply),
            Err(e) => {
                error!(agent_id = %agent.id(), sender = %sender, error = %e, "Agent failed to handle message");
                Dispatch::Reply(self.settings.apology_message.clone())
            }
        }
    }

    async fn sender_lock(&self, sender: &str) -> Arc<Mutex<()>> {
        let mut locks = self.sender_locks.lock().await;
        locks.entry(sender.to_string()).or_default().clone()
    }

    /// Drop the caller's handle and forget the sender once nobody else
    /// holds or waits on its lock. Handles are only cloned under the map
    /// lock, so the count cannot grow while it is checked.
    async fn release_sender_lock(&self, sender: &str, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.sender_locks.lock().await;
        if locks.get(sender).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(sender);
        }
    }

    #[cfg(test)]
    async fn tracked_senders(&self) -> usize {
        self.sender_locks.lock().await.len()
    }

    /// Persist a new profile and register its agent last in routing order.
    pub async fn create_agent(&self, request: NewAgent) -> Result<Arc<Agent>, RouterError> {
        self.ensure_ready()?;
        let profile = request.into_profile(&self.settings.profile_defaults);
        profile.validate()?;
        if profile.assigned_senders.iter().any(|s| s.is_empty()) {
            return Err(RouterError::Validation("sender must not be blank".into()));
        }

        let mut agents = self.agents.write().await;
        if agents.iter().any(|a| a.id() == profile.agent_id) {
            return Err(RouterError::DuplicateAgent(profile.agent_id));
        }
        match self.profiles.create(&profile).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(RouterError::DuplicateAgent(profile.agent_id));
            }
            Err(e) => return Err(e.into()),
        }

        info!(agent_id = %profile.agent_id, name = %profile.name, "Created agent");
        let agent = Arc::new(self.build_agent(profile));
        agents.push(agent.clone());
        Ok(agent)
    }

    pub async fn delete_agent(&self, agent_id: &str) -> Result<(), RouterError> {
        self.ensure_ready()?;
        if self.is_protected(agent_id) {
            return Err(RouterError::ProtectedAgent(agent_id.to_string()));
        }

        let mut agents = self.agents.write().await;
        let position = agents
            .iter()
            .position(|a| a.id() == agent_id)
            .ok_or_else(|| RouterError::NotFound(agent_id.to_string()))?;

        if !self.profiles.delete(agent_id).await? {
            warn!(agent_id = %agent_id, "Live agent had no stored profile");
        }
        agents.remove(position);
        info!(agent_id = %agent_id, "Deleted agent");
        Ok(())
    }

    /// Route `sender` to `agent_id`. Assigning twice is a no-op.
    pub async fn assign(&self, sender: &str, agent_id: &str) -> Result<AgentProfile, RouterError> {
        let sender = checked_sender(sender)?;
        self.ensure_ready()?;

        let agents = self.agents.write().await;
        let agent = find(&agents, agent_id)?;
        let profile = self
            .profiles
            .add_sender(agent_id, sender)
            .await?
            .ok_or_else(|| RouterError::NotFound(agent_id.to_string()))?;
        agent.set_profile(profile.clone()).await;
        info!(agent_id = %agent_id, sender = %sender, "Assigned sender");
        Ok(profile)
    }

    /// Stop routing `sender` to `agent_id`. Unassigning twice is a no-op.
    pub async fn unassign(&self, sender: &str, agent_id: &str) -> Result<AgentProfile, RouterError> {
        let sender = checked_sender(sender)?;
        self.ensure_ready()?;

        let agents = self.agents.write().await;
        let agent = find(&agents, agent_id)?;
        let profile = self
            .profiles
            .remove_sender(agent_id, sender)
            .await?
            .ok_or_else(|| RouterError::NotFound(agent_id.to_string()))?;
        agent.set_profile(profile.clone()).await;
        info!(agent_id = %agent_id, sender = %sender, "Unassigned sender");
        Ok(profile)
    }

    /// Apply a partial update. Senders and identity are left untouched.
    pub async fn update_agent(
        &self,
        agent_id: &str,
        update: ProfileUpdate,
    ) -> Result<AgentProfile, RouterError> {
        self.ensure_ready()?;

        let agents = self.agents.write().await;
        let agent = find(&agents, agent_id)?;
        let updated = update.apply_to(&agent.profile().await);
        updated.validate()?;
        if !self.profiles.update(&updated).await? {
            return Err(RouterError::NotFound(agent_id.to_string()));
        }
        agent.set_profile(updated.clone()).await;
        info!(agent_id = %agent_id, "Updated agent");
        Ok(updated)
    }

    /// Delete the history between `sender` and `agent_id`.
    pub async fn clear_history(&self, sender: &str, agent_id: &str) -> Result<usize, RouterError> {
        let sender = checked_sender(sender)?;
        self.ensure_ready()?;
        let agent = self
            .get_agent(agent_id)
            .await
            .ok_or_else(|| RouterError::NotFound(agent_id.to_string()))?;
        Ok(agent.clear_history(sender).await?)
    }

    pub async fn conversations(&self, agent_id: &str) -> Result<Vec<ConversationSummary>, RouterError> {
        self.ensure_ready()?;
        let agent = self
            .get_agent(agent_id)
            .await
            .ok_or_else(|| RouterError::NotFound(agent_id.to_string()))?;
        Ok(agent.conversations().await?)
    }

    /// Remove turns older than `days` across every agent.
    pub async fn cleanup_history(&self, days: u32) -> Result<usize, RouterError> {
        let removed = self.history.delete_older_than(days).await?;
        info!(days, removed, "Cleaned up old conversation history");
        Ok(removed)
    }

    /// Every live agent, in registration order.
    pub async fn list_agents(&self) -> Result<Vec<AgentSummary>, RouterError> {
        self.ensure_ready()?;
        let agents = self.agents.read().await;
        let mut summaries = Vec::with_capacity(agents.len());
        for agent in agents.iter() {
            summaries.push(agent.profile().await.summary());
        }
        Ok(summaries)
    }

    pub async fn get_agent(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents
            .read()
            .await
            .iter()
            .find(|a| a.id() == agent_id)
            .cloned()
    }

    pub fn is_protected(&self, agent_id: &str) -> bool {
        self.settings.protected_agents.iter().any(|id| id == agent_id)
    }
}

fn checked_sender(sender: &str) -> Result<&str, RouterError> {
    let sender = sender.trim();
    if sender.is_empty() {
        return Err(RouterError::Validation("sender must not be blank".into()));
    }
    Ok(sender)
}

fn find<'a>(agents: &'a [Arc<Agent>], agent_id: &str) -> Result<&'a Arc<Agent>, RouterError> {
    agents
        .iter()
        .find(|a| a.id() == agent_id)
        .ok_or_else(|| RouterError::NotFound(agent_id.to_string()))
}
