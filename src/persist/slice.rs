//! Persisted state slices with write-through to a [`KeyValueStore`].

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::storage::KeyValueStore;

/// A piece of client state that survives restarts.
pub trait Slice: Clone + Default + Serialize + DeserializeOwned {
  /// Logical storage key
  const KEY: &'static str;

  /// Bumped whenever the stored shape changes; older values load as default
  const VERSION: u32;
}

#[derive(Serialize)]
struct Envelope<'a, T> {
  version: u32,
  saved_at: DateTime<Utc>,
  state: &'a T,
}

#[derive(Deserialize)]
struct StoredEnvelope<T> {
  version: u32,
  state: T,
}

/// In-memory copy of a slice, mirrored to the store on every change.
///
/// Reads never touch the store, so a write is visible to the next read
/// even if the store write failed.
pub struct Persisted<T: Slice> {
  store: Arc<dyn KeyValueStore>,
  value: T,
}

impl<T: Slice> Persisted<T> {
  /// Restore the slice from `store`, falling back to defaults when nothing
  /// usable is stored.
  pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
    let value = match store.get(T::KEY) {
      Ok(Some(raw)) => decode(&raw).unwrap_or_else(|e| {
        warn!(key = T::KEY, error = %e, "discarding stored state");
        T::default()
      }),
      Ok(None) => T::default(),
      Err(e) => {
        warn!(key = T::KEY, error = %e, "failed to read stored state");
        T::default()
      }
    };

    Self { store, value }
  }

  pub fn read(&self) -> &T {
    &self.value
  }

  /// Replace the whole slice
  pub fn write(&mut self, value: T) -> Result<()> {
    self.value = value;
    self.flush()
  }

  /// Change part of the slice; composes read-then-write
  pub fn update(&mut self, f: impl FnOnce(&mut T)) -> Result<()> {
    let mut value = self.value.clone();
    f(&mut value);
    self.write(value)
  }

  /// Reset to defaults and forget the stored value
  pub fn clear(&mut self) -> Result<()> {
    self.value = T::default();
    self.store.remove(T::KEY)
  }

  fn flush(&self) -> Result<()> {
    let envelope = Envelope {
      version: T::VERSION,
      saved_at: Utc::now(),
      state: &self.value,
    };
    let raw = serde_json::to_string(&envelope)
      .map_err(|e| eyre!("Failed to serialize {}: {}", T::KEY, e))?;
    self.store.set(T::KEY, &raw)
  }
}

fn decode<T: Slice>(raw: &str) -> Result<T> {
  let stored: StoredEnvelope<T> =
    serde_json::from_str(raw).map_err(|e| eyre!("invalid stored value: {}", e))?;
  if stored.version != T::VERSION {
    return Err(eyre!(
      "stored version {} does not match {}",
      stored.version,
      T::VERSION
    ));
  }
  Ok(stored.state)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::persist::MemoryStore;

  #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
  struct Counter {
    count: u32,
    label: String,
  }

  impl Slice for Counter {
    const KEY: &'static str = "test.counter";
    const VERSION: u32 = 2;
  }

  fn store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
  }

  #[test]
  fn test_missing_value_loads_default() {
    let slice: Persisted<Counter> = Persisted::load(store());
    assert_eq!(slice.read(), &Counter::default());
  }

  #[test]
  fn test_write_is_visible_after_reload() {
    let store = store();
    let mut slice: Persisted<Counter> = Persisted::load(store.clone());
    slice
      .write(Counter {
        count: 3,
        label: "x".into(),
      })
      .unwrap();
    slice.update(|c| c.count += 1).unwrap();
    assert_eq!(slice.read().count, 4);

    let reloaded: Persisted<Counter> = Persisted::load(store);
    assert_eq!(reloaded.read(), slice.read());
  }

  #[test]
  fn test_clear_resets_and_removes() {
    let store = store();
    let mut slice: Persisted<Counter> = Persisted::load(store.clone());
    slice.update(|c| c.count = 9).unwrap();
    slice.clear().unwrap();

    assert_eq!(slice.read(), &Counter::default());
    assert_eq!(store.get(Counter::KEY).unwrap(), None);
  }

  #[test]
  fn test_corrupt_value_falls_back_to_default() {
    let store = store();
    store.set(Counter::KEY, "{not json").unwrap();
    let slice: Persisted<Counter> = Persisted::load(store);
    assert_eq!(slice.read(), &Counter::default());
  }

  #[test]
  fn test_other_version_falls_back_to_default() {
    let store = store();
    store
      .set(
        Counter::KEY,
        r#"{"version": 1, "state": {"count": 5, "label": "old"}}"#,
      )
      .unwrap();
    let slice: Persisted<Counter> = Persisted::load(store);
    assert_eq!(slice.read().count, 0);
  }
}
