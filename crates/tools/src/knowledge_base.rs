//! Knowledge base tool: search and read pages from a document workspace.
//!
//! The tool speaks three actions:
//! - `search`: pages matching a query, each with a short preview
//! - `get_page`: one page's content by id or page URL, truncated for the prompt
//! - `query_database`: entries of a database (a named collection of pages)
//!
//! The backing workspace is a [`KnowledgeSource`]. [`StaticKnowledgeSource`]
//! serves pages from a JSON export on disk.

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use switchboard_core::error::ToolError;
use switchboard_core::tool::Tool;
use tracing::{debug, warn};

const DEFAULT_LIMIT: u64 = 5;
const MAX_LIMIT: u64 = 50;
const PREVIEW_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 2000;

/// One page of the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbPage {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    /// Database the page belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Page {0} not found")]
    PageNotFound(String),

    #[error("Database {0} not found")]
    DatabaseNotFound(String),

    #[error("Knowledge base unavailable: {0}")]
    Unavailable(String),
}

/// A searchable document workspace.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Pages matching `query`, best first, at most `limit`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<KbPage>, KnowledgeError>;

    /// A page by id. Ids compare without dashes and case-insensitively.
    async fn get_page(&self, page_id: &str) -> Result<KbPage, KnowledgeError>;

    /// Every page in a database, in source order.
    async fn query_database(&self, database_id: &str) -> Result<Vec<KbPage>, KnowledgeError>;
}

/// A knowledge source held entirely in memory.
#[derive(Debug, Default)]
pub struct StaticKnowledgeSource {
    pages: Vec<KbPage>,
}

#[derive(Deserialize)]
struct KbFile {
    pages: Vec<KbPage>,
}

impl StaticKnowledgeSource {
    pub fn new(pages: Vec<KbPage>) -> Self {
        Self { pages }
    }

    /// Load from a JSON file shaped `{"pages": [{id, title, url, content, database_id?}]}`.
    pub fn from_file(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            KnowledgeError::Unavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: KbFile = serde_json::from_str(&raw).map_err(|e| {
            KnowledgeError::Unavailable(format!("cannot parse {}: {e}", path.display()))
        })?;
        debug!(pages = file.pages.len(), path = %path.display(), "Loaded knowledge base");
        Ok(Self::new(file.pages))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn normalize_id(id: &str) -> String {
    id.chars().filter(|c| *c != '-').collect::<String>().to_lowercase()
}

#[async_trait]
impl KnowledgeSource for StaticKnowledgeSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<KbPage>, KnowledgeError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<(bool, &KbPage)> = self
            .pages
            .iter()
            .filter_map(|page| {
                let title = page.title.to_lowercase();
                let content = page.content.to_lowercase();
                let all_match = terms
                    .iter()
                    .all(|t| title.contains(t.as_str()) || content.contains(t.as_str()));
                all_match.then(|| (terms.iter().any(|t| title.contains(t.as_str())), page))
            })
            .collect();

        // Title hits first; stable sort keeps source order otherwise
        hits.sort_by_key(|(in_title, _)| !*in_title);
        Ok(hits.into_iter().take(limit).map(|(_, p)| p.clone()).collect())
    }

    async fn get_page(&self, page_id: &str) -> Result<KbPage, KnowledgeError> {
        let wanted = normalize_id(page_id);
        self.pages
            .iter()
            .find(|p| normalize_id(&p.id) == wanted)
            .cloned()
            .ok_or_else(|| KnowledgeError::PageNotFound(page_id.to_string()))
    }

    async fn query_database(&self, database_id: &str) -> Result<Vec<KbPage>, KnowledgeError> {
        let wanted = normalize_id(database_id);
        let items: Vec<KbPage> = self
            .pages
            .iter()
            .filter(|p| p.database_id.as_deref().map(normalize_id).as_deref() == Some(wanted.as_str()))
            .cloned()
            .collect();
        if items.is_empty() {
            return Err(KnowledgeError::DatabaseNotFound(database_id.to_string()));
        }
        Ok(items)
    }
}

/// A 32-hex id, either the whole segment or after the last dash of a slug.
const PAGE_ID_PATTERN: &str = r"(?:^|-)([0-9a-f]{32})$";

/// Pull a 32-hex page id off the end of a page URL.
///
/// `https://www.notion.so/team/Onboarding-0123456789abcdef0123456789abcdef?pvs=4`
/// yields `0123456789abcdef0123456789abcdef`. Anything that isn't a URL
/// ending in such an id is returned unchanged.
pub fn extract_page_id(input: &str) -> &str {
    let trimmed = input.trim();
    if !trimmed.contains("://") {
        return trimmed;
    }
    let path = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    let last_segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    Regex::new(PAGE_ID_PATTERN)
        .ok()
        .and_then(|re| re.captures(last_segment))
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str())
}

/// Error payload with a machine-readable code, as handed to the model.
fn coded_error(message: impl Into<String>, code: &str) -> serde_json::Value {
    serde_json::json!({
        "error": true,
        "message": message.into(),
        "code": code,
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub struct KnowledgeBaseTool {
    source: Arc<dyn KnowledgeSource>,
}

impl KnowledgeBaseTool {
    pub fn new(source: Arc<dyn KnowledgeSource>) -> Self {
        Self { source }
    }

    async fn search(&self, query: Option<&str>, limit: usize) -> serde_json::Value {
        let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
            return switchboard_core::tool::error_payload("Query is required for search action");
        };

        match self.source.search(query, limit).await {
            Ok(pages) if pages.is_empty() => serde_json::json!({
                "found": 0,
                "message": "No pages found matching your query",
            }),
            Ok(pages) => {
                let results: Vec<serde_json::Value> = pages
                    .iter()
                    .map(|p| {
                        let preview = (!p.content.is_empty())
                            .then(|| truncate_chars(&p.content, PREVIEW_CHARS));
                        serde_json::json!({
                            "id": p.id,
                            "title": p.title,
                            "url": p.url,
                            "preview": preview,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "found": results.len(),
                    "pages": results,
                })
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base search failed");
                coded_error(e.to_string(), "KB_SEARCH_ERROR")
            }
        }
    }

    async fn get_page(&self, page_ref: Option<&str>) -> serde_json::Value {
        let Some(page_ref) = page_ref.filter(|q| !q.trim().is_empty()) else {
            return switchboard_core::tool::error_payload("Page ID is required for get_page action");
        };

        match self.source.get_page(extract_page_id(page_ref)).await {
            Ok(page) => {
                let full_length = page.content.chars().count();
                let truncated = full_length > MAX_CONTENT_CHARS;
                let content = if truncated {
                    truncate_chars(&page.content, MAX_CONTENT_CHARS)
                } else {
                    page.content
                };
                serde_json::json!({
                    "title": page.title,
                    "content": content,
                    "truncated": truncated,
                    "full_length": full_length,
                })
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base page lookup failed");
                coded_error(e.to_string(), "KB_GET_PAGE_ERROR")
            }
        }
    }

    async fn query_database(&self, database_id: Option<&str>, limit: usize) -> serde_json::Value {
        let Some(database_id) = database_id.filter(|q| !q.trim().is_empty()) else {
            return switchboard_core::tool::error_payload(
                "Database ID is required for query_database action",
            );
        };

        match self.source.query_database(database_id).await {
            Ok(entries) => {
                let items: Vec<serde_json::Value> = entries
                    .iter()
                    .take(limit)
                    .map(|p| serde_json::json!({"id": p.id, "title": p.title, "url": p.url}))
                    .collect();
                serde_json::json!({
                    "found": entries.len(),
                    "items": items,
                })
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base database query failed");
                coded_error(e.to_string(), "KB_QUERY_ERROR")
            }
        }
    }
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        "query_knowledge_base"
    }

    fn description(&self) -> &str {
        "Search and retrieve content from the knowledge base. Use this tool when users ask about information that might be stored in documentation pages or databases."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["search", "get_page", "query_database"],
                    "description": "\"search\" to find pages, \"get_page\" to read one page by ID or URL, \"query_database\" to list a database"
                },
                "query": {
                    "type": "string",
                    "description": "Search text or page ID/URL. Required for \"search\" and \"get_page\""
                },
                "database_id": {
                    "type": "string",
                    "description": "Database ID. Required for \"query_database\""
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum number of results to return (default: 5)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let limit = arguments["limit"]
            .as_u64()
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT) as usize;
        let query = arguments["query"].as_str();

        let result = match arguments["action"].as_str() {
            Some("search") => self.search(query, limit).await,
            Some("get_page") => self.get_page(query).await,
            Some("query_database") => {
                self.query_database(arguments["database_id"].as_str(), limit).await
            }
            Some(other) => switchboard_core::tool::error_payload(format!("Unknown action: {other}")),
            None => switchboard_core::tool::error_payload("Missing 'action' argument"),
        };
        Ok(result)
    }
}
