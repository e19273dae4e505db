//! Subcommand implementations.

pub mod agents;
pub mod chat;
pub mod maintenance;
pub mod prompt;
pub mod senders;

use async_trait::async_trait;
use std::sync::Arc;
use switchboard_agent::{AgentRouter, RouterSettings};
use switchboard_config::{AppConfig, StoreBackend};
use switchboard_core::error::ProviderError;
use switchboard_core::provider::{Provider, ProviderRequest, ProviderResponse};
use switchboard_core::store::{HistoryStore, ProfileStore};
use switchboard_store::{InMemoryStore, SqliteStore};
use tracing::{debug, warn};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Stands in for the model when a command only manages agents.
struct Unconfigured {
    reason: String,
}

#[async_trait]
impl Provider for Unconfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::NotConfigured(self.reason.clone()))
    }
}

/// The configured provider, or a placeholder that refuses every call.
pub fn management_provider(config: &AppConfig) -> Arc<dyn Provider> {
    switchboard_providers::build_from_config(config).unwrap_or_else(|e| {
        debug!(error = %e, "No model provider configured");
        Arc::new(Unconfigured {
            reason: e.to_string(),
        })
    })
}

/// Open the configured store and return it as both store traits.
pub async fn open_stores(
    config: &AppConfig,
) -> CliResult<(Arc<dyn ProfileStore>, Arc<dyn HistoryStore>)> {
    match config.store.backend {
        StoreBackend::Sqlite => {
            let store = Arc::new(SqliteStore::open(&config.store.db_path()).await?);
            let profiles: Arc<dyn ProfileStore> = store.clone();
            let history: Arc<dyn HistoryStore> = store;
            Ok((profiles, history))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; nothing will be saved");
            let store = Arc::new(InMemoryStore::new());
            let profiles: Arc<dyn ProfileStore> = store.clone();
            let history: Arc<dyn HistoryStore> = store;
            Ok((profiles, history))
        }
    }
}

/// Build and initialize a router from config.
pub async fn open_router(config: &AppConfig, provider: Arc<dyn Provider>) -> CliResult<AgentRouter> {
    let (profiles, history) = open_stores(config).await?;
    let tools = Arc::new(switchboard_tools::default_registry(&config.tools));
    let router = AgentRouter::new(
        profiles,
        history,
        provider,
        tools,
        RouterSettings::from_config(config),
    );
    router.initialize().await?;
    Ok(router)
}

/// Shorten `text` to `max` characters, marking the cut with "...".
pub fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}
