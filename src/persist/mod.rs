//! Client state that survives restarts.
//!
//! Each slice keeps its value in memory and writes through to an injected
//! [`KeyValueStore`] on every change, so tests can swap SQLite for
//! [`MemoryStore`].

mod slice;
mod storage;

pub use slice::{Persisted, Slice};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
