//! SQLite store for profiles and conversation history.
//!
//! Uses a single SQLite database file with two tables:
//! - `agent_profiles`: one row per agent, sender and tool lists as JSON
//! - `conversation_turns`: the append-only turn log
//!
//! Timestamps are stored as integer microseconds since the epoch so that
//! ordering is exact. The `iid` autoincrement column records insertion
//! order and breaks timestamp ties.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use switchboard_core::error::StoreError;
use switchboard_core::history::{self, ConversationSummary, ConversationTurn, TurnRole};
use switchboard_core::profile::AgentProfile;
use switchboard_core::store::{HistoryStore, ProfileStore};
use tracing::{debug, info, warn};

/// A SQLite-backed implementation of both store traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a store from a SQLite URL or path string.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite path: {e}")))?;
        // Every connection to :memory: is its own database
        let max_connections = if url.contains(":memory:") { 1 } else { 4 };
        let store = Self::connect(options, max_connections).await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("Cannot create {}: {e}", parent.display()))
            })?;
        }
        let options = SqliteConnectOptions::new().filename(path);
        let store = Self::connect(options, 4).await?;
        info!("SQLite store initialized at {}", path.display());
        Ok(store)
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self, StoreError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        Self::from_pool(pool).await
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations. Every statement is idempotent.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_profiles (
                iid              INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id         TEXT UNIQUE NOT NULL,
                name             TEXT NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                system_prompt    TEXT NOT NULL,
                model            TEXT NOT NULL,
                temperature      REAL NOT NULL,
                max_tokens       INTEGER NOT NULL,
                tools_enabled    INTEGER NOT NULL DEFAULT 0,
                enabled_tools    TEXT NOT NULL DEFAULT '[]',
                assigned_senders TEXT NOT NULL DEFAULT '[]',
                created_at       INTEGER NOT NULL,
                updated_at       INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("agent_profiles table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                iid         INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT UNIQUE NOT NULL,
                agent_id    TEXT NOT NULL,
                sender      TEXT NOT NULL,
                sender_name TEXT NOT NULL DEFAULT '',
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                timestamp   INTEGER NOT NULL,
                message_id  TEXT,
                metadata    TEXT NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversation_turns table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turns_pair_ts ON conversation_turns(agent_id, sender, timestamp)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("pair index: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_turns_ts ON conversation_turns(timestamp)")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("timestamp index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse an `AgentProfile` from a row.
    fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<AgentProfile, StoreError> {
        let agent_id: String = row
            .try_get("agent_id")
            .map_err(|e| StoreError::QueryFailed(format!("agent_id column: {e}")))?;
        let decode = |what: &str, e: String| StoreError::QueryFailed(format!("{agent_id}: {what}: {e}"));

        let name: String = row.try_get("name").map_err(|e| decode("name", e.to_string()))?;
        let description: String = row
            .try_get("description")
            .map_err(|e| decode("description", e.to_string()))?;
        let system_prompt: String = row
            .try_get("system_prompt")
            .map_err(|e| decode("system_prompt", e.to_string()))?;
        let model: String = row.try_get("model").map_err(|e| decode("model", e.to_string()))?;
        let temperature: f64 = row
            .try_get("temperature")
            .map_err(|e| decode("temperature", e.to_string()))?;
        let max_tokens: i64 = row
            .try_get("max_tokens")
            .map_err(|e| decode("max_tokens", e.to_string()))?;
        let max_tokens = u32::try_from(max_tokens).map_err(|e| decode("max_tokens", e.to_string()))?;
        let tools_enabled: bool = row
            .try_get("tools_enabled")
            .map_err(|e| decode("tools_enabled", e.to_string()))?;
        let enabled_tools_json: String = row
            .try_get("enabled_tools")
            .map_err(|e| decode("enabled_tools", e.to_string()))?;
        let senders_json: String = row
            .try_get("assigned_senders")
            .map_err(|e| decode("assigned_senders", e.to_string()))?;
        let created_at: i64 = row
            .try_get("created_at")
            .map_err(|e| decode("created_at", e.to_string()))?;
        let updated_at: i64 = row
            .try_get("updated_at")
            .map_err(|e| decode("updated_at", e.to_string()))?;

        let enabled_tools: Vec<String> = serde_json::from_str(&enabled_tools_json)
            .map_err(|e| decode("enabled_tools", e.to_string()))?;
        let assigned_senders: Vec<String> = serde_json::from_str(&senders_json)
            .map_err(|e| decode("assigned_senders", e.to_string()))?;

        Ok(AgentProfile {
            agent_id: agent_id.clone(),
            name,
            description,
            system_prompt,
            model,
            temperature: temperature as f32,
            max_tokens,
            tools_enabled,
            enabled_tools,
            assigned_senders,
            created_at: from_micros(created_at).ok_or_else(|| decode("created_at", "out of range".into()))?,
            updated_at: from_micros(updated_at).ok_or_else(|| decode("updated_at", "out of range".into()))?,
        })
    }

    /// Parse a `ConversationTurn` from a row.
    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationTurn, StoreError> {
        let get_err = |col: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{col} column: {e}"));

        let id: String = row.try_get("id").map_err(|e| get_err("id", e))?;
        let agent_id: String = row.try_get("agent_id").map_err(|e| get_err("agent_id", e))?;
        let sender: String = row.try_get("sender").map_err(|e| get_err("sender", e))?;
        let sender_name: String = row.try_get("sender_name").map_err(|e| get_err("sender_name", e))?;
        let role: String = row.try_get("role").map_err(|e| get_err("role", e))?;
        let content: String = row.try_get("content").map_err(|e| get_err("content", e))?;
        let timestamp: i64 = row.try_get("timestamp").map_err(|e| get_err("timestamp", e))?;
        let message_id: Option<String> = row.try_get("message_id").map_err(|e| get_err("message_id", e))?;
        let metadata_json: String = row.try_get("metadata").map_err(|e| get_err("metadata", e))?;

        let role = TurnRole::parse(&role)
            .ok_or_else(|| StoreError::QueryFailed(format!("turn {id}: unknown role '{role}'")))?;
        let timestamp = from_micros(timestamp)
            .ok_or_else(|| StoreError::QueryFailed(format!("turn {id}: timestamp out of range")))?;
        let metadata = serde_json::from_str(&metadata_json).unwrap_or_default();

        Ok(ConversationTurn {
            id,
            agent_id,
            sender,
            sender_name,
            role,
            content,
            timestamp,
            message_id,
            metadata,
        })
    }

    /// Rewrite a profile's sender list inside one transaction.
    async fn edit_senders<F>(&self, agent_id: &str, edit: F) -> Result<Option<AgentProfile>, StoreError>
    where
        F: FnOnce(&mut Vec<String>) -> bool + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Unavailable(format!("BEGIN failed: {e}")))?;

        let row = sqlx::query("SELECT assigned_senders FROM agent_profiles WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT senders: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let senders_json: String = row
            .try_get("assigned_senders")
            .map_err(|e| StoreError::QueryFailed(format!("assigned_senders column: {e}")))?;
        let mut senders: Vec<String> = serde_json::from_str(&senders_json)
            .map_err(|e| StoreError::QueryFailed(format!("assigned_senders JSON: {e}")))?;

        if edit(&mut senders) {
            let senders_json = serde_json::to_string(&senders)
                .map_err(|e| StoreError::QueryFailed(format!("Senders serialization: {e}")))?;
            sqlx::query("UPDATE agent_profiles SET assigned_senders = ?1, updated_at = ?2 WHERE agent_id = ?3")
                .bind(&senders_json)
                .bind(Utc::now().timestamp_micros())
                .bind(agent_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("UPDATE senders: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("COMMIT failed: {e}")))?;

        ProfileStore::get(self, agent_id).await
    }
}

fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

fn to_json(list: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(list).map_err(|e| StoreError::QueryFailed(format!("List serialization: {e}")))
}

#[async_trait]
impl ProfileStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create(&self, profile: &AgentProfile) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO agent_profiles (
                agent_id, name, description, system_prompt, model, temperature, max_tokens,
                tools_enabled, enabled_tools, assigned_senders, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&profile.agent_id)
        .bind(&profile.name)
        .bind(&profile.description)
        .bind(&profile.system_prompt)
        .bind(&profile.model)
        .bind(f64::from(profile.temperature))
        .bind(i64::from(profile.max_tokens))
        .bind(profile.tools_enabled)
        .bind(to_json(&profile.enabled_tools)?)
        .bind(to_json(&profile.assigned_senders)?)
        .bind(profile.created_at.timestamp_micros())
        .bind(profile.updated_at.timestamp_micros())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(agent_id = %profile.agent_id, "Stored profile");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(profile.agent_id.clone()))
            }
            Err(e) => Err(StoreError::QueryFailed(format!("INSERT profile failed: {e}"))),
        }
    }

    async fn get(&self, agent_id: &str) -> Result<Option<AgentProfile>, StoreError> {
        let row = sqlx::query("SELECT * FROM agent_profiles WHERE agent_id = ?1")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET profile: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_profile(r)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, profile: &AgentProfile) -> Result<bool, StoreError> {
        // Senders and created_at are owned by the store
        let result = sqlx::query(
            r#"
            UPDATE agent_profiles SET
                name = ?1, description = ?2, system_prompt = ?3, model = ?4,
                temperature = ?5, max_tokens = ?6, tools_enabled = ?7,
                enabled_tools = ?8, updated_at = ?9
            WHERE agent_id = ?10
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.description)
        .bind(&profile.system_prompt)
        .bind(&profile.model)
        .bind(f64::from(profile.temperature))
        .bind(i64::from(profile.max_tokens))
        .bind(profile.tools_enabled)
        .bind(to_json(&profile.enabled_tools)?)
        .bind(profile.updated_at.timestamp_micros())
        .bind(&profile.agent_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("UPDATE profile failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, agent_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM agent_profiles WHERE agent_id = ?1")
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("DELETE profile failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<AgentProfile>, StoreError> {
        let rows = sqlx::query("SELECT * FROM agent_profiles ORDER BY iid ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("LIST profiles: {e}")))?;

        Ok(rows
            .iter()
            .filter_map(|row| match Self::row_to_profile(row) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable profile row");
                    None
                }
            })
            .collect())
    }

    async fn add_sender(&self, agent_id: &str, sender: &str) -> Result<Option<AgentProfile>, StoreError> {
        let sender = sender.to_string();
        self.edit_senders(agent_id, move |senders| {
            if senders.contains(&sender) {
                false
            } else {
                senders.push(sender);
                true
            }
        })
        .await
    }

    async fn remove_sender(&self, agent_id: &str, sender: &str) -> Result<Option<AgentProfile>, StoreError> {
        let sender = sender.to_string();
        self.edit_senders(agent_id, move |senders| {
            let before = senders.len();
            senders.retain(|s| *s != sender);
            senders.len() != before
        })
        .await
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, turn: &ConversationTurn) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&turn.metadata)
            .map_err(|e| StoreError::QueryFailed(format!("Metadata serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO conversation_turns
                (id, agent_id, sender, sender_name, role, content, timestamp, message_id, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&turn.id)
        .bind(&turn.agent_id)
        .bind(&turn.sender)
        .bind(&turn.sender_name)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.timestamp.timestamp_micros())
        .bind(&turn.message_id)
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("INSERT turn failed: {e}")))?;

        Ok(())
    }

    async fn read_recent(
        &self,
        agent_id: &str,
        sender: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM conversation_turns
            WHERE agent_id = ?1 AND sender = ?2
            ORDER BY timestamp DESC, iid DESC
            LIMIT ?3
            "#,
        )
        .bind(agent_id)
        .bind(sender)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("READ recent turns: {e}")))?;

        let mut turns: Vec<ConversationTurn> = rows
            .iter()
            .filter_map(|row| match Self::row_to_turn(row) {
                Ok(turn) => Some(turn),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable turn row");
                    None
                }
            })
            .collect();
        turns.reverse();
        Ok(turns)
    }

    async fn clear(&self, agent_id: &str, sender: &str) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM conversation_turns WHERE agent_id = ?1 AND sender = ?2")
            .bind(agent_id)
            .bind(sender)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("CLEAR turns failed: {e}")))?;

        Ok(result.rows_affected() as usize)
    }

    async fn aggregate_by_sender(&self, agent_id: &str) -> Result<Vec<ConversationSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT t.sender, t.sender_name, t.content, t.timestamp, c.cnt
            FROM conversation_turns t
            JOIN (
                SELECT sender, MAX(timestamp) AS last_ts, COUNT(*) AS cnt
                FROM conversation_turns
                WHERE agent_id = ?1
                GROUP BY sender
            ) c ON t.sender = c.sender AND t.timestamp = c.last_ts
            WHERE t.agent_id = ?1
            ORDER BY t.timestamp DESC, t.iid DESC
            "#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("AGGREGATE turns: {e}")))?;

        let mut seen = HashSet::new();
        let mut summaries = Vec::new();
        for row in &rows {
            let sender: String = row
                .try_get("sender")
                .map_err(|e| StoreError::QueryFailed(format!("sender column: {e}")))?;
            // Timestamp ties yield several rows per sender; the first is the latest insert
            if !seen.insert(sender.clone()) {
                continue;
            }
            let sender_name: String = row
                .try_get("sender_name")
                .map_err(|e| StoreError::QueryFailed(format!("sender_name column: {e}")))?;
            let last_message: String = row
                .try_get("content")
                .map_err(|e| StoreError::QueryFailed(format!("content column: {e}")))?;
            let timestamp: i64 = row
                .try_get("timestamp")
                .map_err(|e| StoreError::QueryFailed(format!("timestamp column: {e}")))?;
            let count: i64 = row
                .try_get("cnt")
                .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

            let Some(last_timestamp) = from_micros(timestamp) else {
                warn!(sender = %sender, "Skipping summary with out-of-range timestamp");
                continue;
            };
            summaries.push(ConversationSummary {
                sender,
                sender_name,
                last_message,
                last_timestamp,
                message_count: count as usize,
            });
        }
        history::sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn delete_older_than(&self, days: u32) -> Result<usize, StoreError> {
        let cutoff = history::retention_cutoff(days);
        let result = sqlx::query("DELETE FROM conversation_turns WHERE timestamp < ?1")
            .bind(cutoff.timestamp_micros())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("RETENTION delete failed: {e}")))?;

        let removed = result.rows_affected() as usize;
        info!(days, removed, "Retention cleanup complete");
        Ok(removed)
    }

    async fn count(&self, agent_id: &str, sender: &str) -> Result<usize, StoreError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM conversation_turns WHERE agent_id = ?1 AND sender = ?2",
        )
        .bind(agent_id)
        .bind(sender)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use switchboard_core::profile::{NewAgent, ProfileDefaults};

    async fn test_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).await.unwrap();
        (store, dir)
    }

    fn profile(id: &str) -> AgentProfile {
        NewAgent::new(id, format!("Agent {id}"), "You help.")
            .with_tools(["current_time"])
            .into_profile(&ProfileDefaults::default())
    }

    #[tokio::test]
    async fn profile_crud_roundtrip() {
        let (store, _dir) = test_store().await;
        let p = profile("sales");
        store.create(&p).await.unwrap();

        let loaded = ProfileStore::get(&store, "sales").await.unwrap().unwrap();
        assert_eq!(loaded.name, p.name);
        assert_eq!(loaded.enabled_tools, vec!["current_time"]);
        assert!(loaded.tools_enabled);
        assert_eq!(loaded.max_tokens, 800);
        assert_eq!(loaded.created_at.timestamp_micros(), p.created_at.timestamp_micros());

        let mut changed = loaded.clone();
        changed.temperature = 0.25;
        changed.assigned_senders = vec!["ignored".into()];
        assert!(store.update(&changed).await.unwrap());
        let loaded = ProfileStore::get(&store, "sales").await.unwrap().unwrap();
        assert_eq!(loaded.temperature, 0.25);
        assert!(loaded.assigned_senders.is_empty());

        assert!(ProfileStore::delete(&store, "sales").await.unwrap());
        assert!(!ProfileStore::delete(&store, "sales").await.unwrap());
        assert!(ProfileStore::get(&store, "sales").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_create_maps_to_duplicate() {
        let (store, _dir) = test_store().await;
        store.create(&profile("a")).await.unwrap();
        let err = store.create(&profile("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(id) if id == "a"));
    }

    #[tokio::test]
    async fn list_all_in_creation_order() {
        let (store, _dir) = test_store().await;
        for id in ["zeta", "alpha", "mid"] {
            store.create(&profile(id)).await.unwrap();
        }
        let ids: Vec<String> = store.list_all().await.unwrap().into_iter().map(|p| p.agent_id).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn list_all_skips_corrupt_rows() {
        let (store, _dir) = test_store().await;
        store.create(&profile("good")).await.unwrap();
        store.create(&profile("bad")).await.unwrap();
        sqlx::query("UPDATE agent_profiles SET enabled_tools = 'not json' WHERE agent_id = 'bad'")
            .execute(&store.pool)
            .await
            .unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].agent_id, "good");
    }

    #[tokio::test]
    async fn senders_add_and_remove_idempotently() {
        let (store, _dir) = test_store().await;
        store.create(&profile("a")).await.unwrap();

        store.add_sender("a", "+1").await.unwrap();
        store.add_sender("a", "+2").await.unwrap();
        let p = store.add_sender("a", "+1").await.unwrap().unwrap();
        assert_eq!(p.assigned_senders, vec!["+1", "+2"]);

        let p = store.remove_sender("a", "+1").await.unwrap().unwrap();
        assert_eq!(p.assigned_senders, vec!["+2"]);
        let p = store.remove_sender("a", "+1").await.unwrap().unwrap();
        assert_eq!(p.assigned_senders, vec!["+2"]);

        assert!(store.add_sender("nobody", "+1").await.unwrap().is_none());
        assert_eq!(store.find_by_sender("+2").await.unwrap().unwrap().agent_id, "a");
    }

    #[tokio::test]
    async fn turns_read_back_chronologically() {
        let (store, _dir) = test_store().await;
        let t0 = Utc::now() - Duration::minutes(1);
        let u1 = ConversationTurn::user("a", "+1", "Ann", "u1").with_timestamp(t0);
        let a1 = ConversationTurn::assistant("a", "+1", "Ann", "a1").with_timestamp(t0 + Duration::microseconds(1));
        let u2 = ConversationTurn::user("a", "+1", "Ann", "u2")
            .with_timestamp(t0 + Duration::microseconds(2))
            .with_message_id("wamid.1")
            .with_metadata("has_media", serde_json::json!(false));

        for turn in [&u2, &u1, &a1] {
            store.append(turn).await.unwrap();
        }

        let turns = store.read_recent("a", "+1", 10).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["u1", "a1", "u2"]);
        assert_eq!(turns[2].message_id.as_deref(), Some("wamid.1"));
        assert_eq!(turns[2].metadata["has_media"], serde_json::json!(false));
        assert_eq!(turns[0].timestamp.timestamp_micros(), u1.timestamp.timestamp_micros());

        let last_two = store.read_recent("a", "+1", 2).await.unwrap();
        assert_eq!(last_two[0].content, "a1");
        assert_eq!(last_two[1].content, "u2");
    }

    #[tokio::test]
    async fn aggregation_and_counts() {
        let (store, _dir) = test_store().await;
        let t0 = Utc::now() - Duration::minutes(10);
        store.append(&ConversationTurn::user("a", "+1", "Ann", "hello").with_timestamp(t0)).await.unwrap();
        store.append(&ConversationTurn::assistant("a", "+1", "Ann", "hi Ann").with_timestamp(t0 + Duration::minutes(1))).await.unwrap();
        store.append(&ConversationTurn::user("a", "+2", "Bob", "yo").with_timestamp(t0 + Duration::minutes(5))).await.unwrap();
        store.append(&ConversationTurn::user("b", "+3", "Cat", "other agent")).await.unwrap();

        let summaries = store.aggregate_by_sender("a").await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].sender, "+2");
        assert_eq!(summaries[0].message_count, 1);
        assert_eq!(summaries[1].sender, "+1");
        assert_eq!(summaries[1].message_count, 2);
        assert_eq!(summaries[1].last_message, "hi Ann");

        assert_eq!(store.count("a", "+1").await.unwrap(), 2);
        assert_eq!(store.clear("a", "+1").await.unwrap(), 2);
        assert!(store.read_recent("a", "+1", 10).await.unwrap().is_empty());
        assert_eq!(store.count("a", "+2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retention_removes_only_old_turns() {
        let (store, _dir) = test_store().await;
        store.append(&ConversationTurn::user("a", "+1", "Ann", "ancient").with_timestamp(Utc::now() - Duration::days(45))).await.unwrap();
        store.append(&ConversationTurn::user("b", "+2", "Bob", "old").with_timestamp(Utc::now() - Duration::days(31))).await.unwrap();
        store.append(&ConversationTurn::user("a", "+1", "Ann", "fresh")).await.unwrap();

        assert_eq!(store.delete_older_than(30).await.unwrap(), 2);
        let turns = store.read_recent("a", "+1", 10).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "fresh");
    }

    #[tokio::test]
    async fn retention_window_past_the_calendar_deletes_nothing() {
        let (store, _dir) = test_store().await;
        store.append(&ConversationTurn::user("a", "+1", "Ann", "old").with_timestamp(Utc::now() - Duration::days(4000))).await.unwrap();

        assert_eq!(store.delete_older_than(u32::MAX).await.unwrap(), 0);
        assert_eq!(store.count("a", "+1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn aggregate_breaks_timestamp_ties_by_sender() {
        let (store, _dir) = test_store().await;
        let t = Utc::now();
        for (sender, name) in [("+3", "Cy"), ("+1", "Ann"), ("+2", "Bob")] {
            store.append(&ConversationTurn::user("a", sender, name, "hi").with_timestamp(t)).await.unwrap();
        }

        let senders: Vec<String> = store
            .aggregate_by_sender("a")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.sender)
            .collect();
        assert_eq!(senders, ["+1", "+2", "+3"]);
    }

    #[tokio::test]
    async fn reopening_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("switchboard.db");
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.create(&profile("persisted")).await.unwrap();
        }
        let store = SqliteStore::open(&path).await.unwrap();
        assert!(ProfileStore::get(&store, "persisted").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn in_memory_url_works() {
        let store = SqliteStore::new("sqlite::memory:").await.unwrap();
        store.create(&profile("a")).await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }
}
