//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use switchboard_core::error::StoreError;
use switchboard_core::history::{self, ConversationSummary, ConversationTurn};
use switchboard_core::profile::AgentProfile;
use switchboard_core::store::{HistoryStore, ProfileStore};
use tokio::sync::RwLock;

/// Profiles and turns kept in two Vecs.
///
/// Vec order is creation order for profiles and insertion order for turns.
pub struct InMemoryStore {
    profiles: RwLock<Vec<AgentProfile>>,
    turns: RwLock<Vec<ConversationTurn>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(Vec::new()),
            turns: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create(&self, profile: &AgentProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().await;
        if profiles.iter().any(|p| p.agent_id == profile.agent_id) {
            return Err(StoreError::Duplicate(profile.agent_id.clone()));
        }
        profiles.push(profile.clone());
        Ok(())
    }

    async fn get(&self, agent_id: &str) -> Result<Option<AgentProfile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.iter().find(|p| p.agent_id == agent_id).cloned())
    }

    async fn update(&self, profile: &AgentProfile) -> Result<bool, StoreError> {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|p| p.agent_id == profile.agent_id) {
            Some(existing) => {
                let senders = std::mem::take(&mut existing.assigned_senders);
                let created_at = existing.created_at;
                *existing = profile.clone();
                existing.assigned_senders = senders;
                existing.created_at = created_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, agent_id: &str) -> Result<bool, StoreError> {
        let mut profiles = self.profiles.write().await;
        let len_before = profiles.len();
        profiles.retain(|p| p.agent_id != agent_id);
        Ok(profiles.len() < len_before)
    }

    async fn list_all(&self) -> Result<Vec<AgentProfile>, StoreError> {
        Ok(self.profiles.read().await.clone())
    }

    async fn add_sender(&self, agent_id: &str, sender: &str) -> Result<Option<AgentProfile>, StoreError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles
            .iter_mut()
            .find(|p| p.agent_id == agent_id)
            .map(|p| {
                p.add_sender(sender);
                p.clone()
            }))
    }

    async fn remove_sender(&self, agent_id: &str, sender: &str) -> Result<Option<AgentProfile>, StoreError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles
            .iter_mut()
            .find(|p| p.agent_id == agent_id)
            .map(|p| {
                p.remove_sender(sender);
                p.clone()
            }))
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), StoreError> {
        self.turns.write().await.push(turn.clone());
        Ok(())
    }

    async fn read_recent(
        &self,
        agent_id: &str,
        sender: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        let turns = self.turns.read().await;
        let mut matching: Vec<ConversationTurn> = turns
            .iter()
            .filter(|t| t.agent_id == agent_id && t.sender == sender)
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps
        matching.sort_by_key(|t| t.timestamp);
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.split_off(skip))
    }

    async fn clear(&self, agent_id: &str, sender: &str) -> Result<usize, StoreError> {
        let mut turns = self.turns.write().await;
        let len_before = turns.len();
        turns.retain(|t| !(t.agent_id == agent_id && t.sender == sender));
        Ok(len_before - turns.len())
    }

    async fn aggregate_by_sender(&self, agent_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let turns = self.turns.read().await;
        Ok(history::summarize_by_sender(
            turns.iter().filter(|t| t.agent_id == agent_id),
        ))
    }

    async fn delete_older_than(&self, days: u32) -> Result<usize, StoreError> {
        let cutoff = history::retention_cutoff(days);
        let mut turns = self.turns.write().await;
        let len_before = turns.len();
        turns.retain(|t| t.timestamp >= cutoff);
        Ok(len_before - turns.len())
    }

    async fn count(&self, agent_id: &str, sender: &str) -> Result<usize, StoreError> {
        let turns = self.turns.read().await;
        Ok(turns
            .iter()
            .filter(|t| t.agent_id == agent_id && t.sender == sender)
            .count())
    }
}
