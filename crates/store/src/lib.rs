//! Profile and conversation-history stores for Switchboard.
//!
//! Both backends implement [`ProfileStore`](switchboard_core::ProfileStore)
//! and [`HistoryStore`](switchboard_core::HistoryStore) on a single value,
//! so one instance can be shared as both trait objects.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
