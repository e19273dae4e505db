//! # Switchboard Core
//!
//! Domain types, traits, and error definitions for the Switchboard
//! multi-agent chat router. This crate has **no runtime dependencies** on
//! HTTP, databases or async executors; it defines the domain model that
//! all other crates implement against.
//!
//! ## Layout
//!
//! - [`provider`]: the model backend contract
//! - [`tool`]: the tool contract and the [`ToolRegistry`]
//! - [`profile`] / [`history`]: agent and conversation data
//! - [`store`]: persistence contracts for both
//!
//! All crates depend inward on core, so any piece can be swapped for a
//! mock in tests.

pub mod error;
pub mod history;
pub mod message;
pub mod profile;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, RouterError, StoreError, ToolError};
pub use history::{ConversationSummary, ConversationTurn, TurnRole};
pub use message::{Message, MessageToolCall, Role};
pub use profile::{AgentProfile, AgentSummary, NewAgent, ProfileDefaults, ProfileUpdate};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition, Usage};
pub use store::{HistoryStore, ProfileStore};
pub use tool::{Tool, ToolRegistry};
