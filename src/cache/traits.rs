//! Core traits and types for the query cache.

use crate::error::ApiError;
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for values that address a cache entry.
///
/// A key combines a query kind with its parameters (e.g. a page number).
/// Invalidation works on whole kinds.
pub trait QueryKey: Clone + Eq + Hash + Debug {
  type Kind: Copy + Eq + Debug;

  /// The kind of query this key belongs to
  fn kind(&self) -> Self::Kind;

  /// Human readable description for logs
  fn description(&self) -> String;
}

/// Lifecycle state of a single cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Never requested, or invalidated while its only request was in flight
  Idle,
  /// A request for this key is in flight
  Pending,
  /// Last request succeeded
  Success,
  /// Last request failed
  Error,
}

/// What a read intent did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// Served from the entry without any request
  Cached,
  /// Joined the request already in flight for this key
  Shared,
  /// A new request was issued
  Started,
}

/// Borrowed view of an entry, for rendering
#[derive(Debug)]
pub struct QuerySnapshot<'a, V> {
  pub status: QueryStatus,
  /// Last successful value; kept while a refetch is in flight
  pub data: Option<&'a V>,
  pub error: Option<&'a ApiError>,
  pub is_stale: bool,
}

impl<V> QuerySnapshot<'_, V> {
  pub fn idle() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      is_stale: true,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Pending
  }
}

/// What one call to `QueryCache::poll` applied
#[derive(Debug)]
pub struct PollReport<K> {
  /// Requests that settled successfully
  pub succeeded: usize,
  /// Requests that failed, with the error now stored on the entry
  pub failed: Vec<(K, ApiError)>,
}

impl<K> PollReport<K> {
  /// Whether any entry changed
  pub fn changed(&self) -> bool {
    self.succeeded > 0 || !self.failed.is_empty()
  }

  /// Combine reports from several caches sharing a key type
  pub fn merge(mut self, other: PollReport<K>) -> Self {
    self.succeeded += other.succeeded;
    self.failed.extend(other.failed);
    self
  }
}

impl<K> Default for PollReport<K> {
  fn default() -> Self {
    Self {
      succeeded: 0,
      failed: Vec::new(),
    }
  }
}
