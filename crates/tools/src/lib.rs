//! Built-in tool implementations for Switchboard.
//!
//! Tools give agents the ability to look things up mid-conversation:
//! read the clock and query a knowledge base.

pub mod current_time;
pub mod knowledge_base;

use std::sync::Arc;
use switchboard_config::ToolsConfig;
use switchboard_core::tool::ToolRegistry;
use tracing::{info, warn};

pub use current_time::CurrentTimeTool;
pub use knowledge_base::{
    KbPage, KnowledgeBaseTool, KnowledgeError, KnowledgeSource, StaticKnowledgeSource,
};

/// Create a tool registry with all built-in tools the config allows.
///
/// `query_knowledge_base` is registered only when `knowledge_base_path`
/// is set and loads. A broken file is logged and the tool left out, so
/// agents that enable it simply run without it.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CurrentTimeTool));

    if let Some(path) = &config.knowledge_base_path {
        match StaticKnowledgeSource::from_file(path) {
            Ok(source) => {
                info!(pages = source.len(), "Knowledge base tool enabled");
                registry.register(Box::new(KnowledgeBaseTool::new(Arc::new(source))));
            }
            Err(e) => warn!(error = %e, "Knowledge base tool disabled"),
        }
    }

    registry
}
