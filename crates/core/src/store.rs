//! Persistence traits for profiles and conversation history.
//!
//! Implementations: SQLite and in-memory (for tests and ephemeral runs),
//! both in `switchboard-store`.

use async_trait::async_trait;
use crate::error::StoreError;
use crate::history::{ConversationSummary, ConversationTurn};
use crate::profile::AgentProfile;

/// CRUD over agent profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Insert a new profile. Fails with [`StoreError::Duplicate`] if the id exists.
    async fn create(&self, profile: &AgentProfile) -> std::result::Result<(), StoreError>;

    async fn get(&self, agent_id: &str) -> std::result::Result<Option<AgentProfile>, StoreError>;

    /// Replace an existing profile. Returns false if the id is unknown.
    async fn update(&self, profile: &AgentProfile) -> std::result::Result<bool, StoreError>;

    /// Returns false if the id is unknown.
    async fn delete(&self, agent_id: &str) -> std::result::Result<bool, StoreError>;

    /// Every profile, in creation order.
    async fn list_all(&self) -> std::result::Result<Vec<AgentProfile>, StoreError>;

    /// Idempotently append a sender. Returns the stored profile, or `None`
    /// if the agent does not exist.
    async fn add_sender(
        &self,
        agent_id: &str,
        sender: &str,
    ) -> std::result::Result<Option<AgentProfile>, StoreError>;

    /// Idempotently remove a sender. Same return contract as [`add_sender`](Self::add_sender).
    async fn remove_sender(
        &self,
        agent_id: &str,
        sender: &str,
    ) -> std::result::Result<Option<AgentProfile>, StoreError>;

    /// The first profile, in creation order, that lists `sender`.
    async fn find_by_sender(&self, sender: &str) -> std::result::Result<Option<AgentProfile>, StoreError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .find(|p| p.has_sender(sender)))
    }
}

/// Append-only log of conversation turns keyed by (agent, sender).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    fn name(&self) -> &str;

    async fn append(&self, turn: &ConversationTurn) -> std::result::Result<(), StoreError>;

    /// The latest `limit` turns for the pair, oldest first.
    async fn read_recent(
        &self,
        agent_id: &str,
        sender: &str,
        limit: usize,
    ) -> std::result::Result<Vec<ConversationTurn>, StoreError>;

    /// Delete all turns for the pair. Returns how many were removed.
    async fn clear(&self, agent_id: &str, sender: &str) -> std::result::Result<usize, StoreError>;

    /// One summary per sender, most recently active first.
    async fn aggregate_by_sender(
        &self,
        agent_id: &str,
    ) -> std::result::Result<Vec<ConversationSummary>, StoreError>;

    /// Retention cleanup across all agents. Returns how many turns were removed.
    async fn delete_older_than(&self, days: u32) -> std::result::Result<usize, StoreError>;

    async fn count(&self, agent_id: &str, sender: &str) -> std::result::Result<usize, StoreError>;
}
