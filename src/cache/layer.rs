//! Key-addressed query cache with stale-time and kind-based invalidation.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::debug;

use super::traits::{FetchOutcome, PollReport, QueryKey, QuerySnapshot, QueryStatus};
use crate::error::ApiError;

type FetchResult<V> = Result<V, ApiError>;

/// A single cached query result.
struct CacheEntry<V> {
  data: Option<V>,
  /// Set iff the most recent settled request failed
  error: Option<ApiError>,
  status: QueryStatus,
  fetched_at: Option<Instant>,
  invalidated: bool,
  in_flight: Option<oneshot::Receiver<FetchResult<V>>>,
}

impl<V> CacheEntry<V> {
  fn new() -> Self {
    Self {
      data: None,
      error: None,
      status: QueryStatus::Idle,
      fetched_at: None,
      invalidated: false,
      in_flight: None,
    }
  }

  /// Status the entry falls back to when its in-flight request is dropped
  fn settled_status(&self) -> QueryStatus {
    if self.error.is_some() {
      QueryStatus::Error
    } else if self.data.is_some() {
      QueryStatus::Success
    } else {
      QueryStatus::Idle
    }
  }
}

/// Explicit map from query key to {value, status, freshness}.
///
/// Reads go through [`QueryCache::fetch`]: a fresh success is served as-is,
/// a key with a request in flight shares that request, anything else
/// spawns the fetcher on the tokio runtime. Results are applied on the
/// owning task by [`QueryCache::poll`], so the cache itself is never shared
/// across tasks.
pub struct QueryCache<K: QueryKey, V> {
  entries: HashMap<K, CacheEntry<V>>,
  /// How long before a successful result is considered stale
  stale_time: Duration,
}

impl<K: QueryKey, V: Send + 'static> QueryCache<K, V> {
  pub fn new() -> Self {
    Self {
      entries: HashMap::new(),
      stale_time: Duration::from_secs(5 * 60),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Read intent for `key`.
  ///
  /// The fetcher is only called when a new request is needed. Failed
  /// entries are served as-is until invalidated or refetched; nothing is
  /// retried automatically.
  pub fn fetch<F, Fut>(&mut self, key: &K, fetcher: F) -> FetchOutcome
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchResult<V>> + Send + 'static,
  {
    let stale_time = self.stale_time;
    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(CacheEntry::new);

    if entry.in_flight.is_some() {
      return FetchOutcome::Shared;
    }

    let needs_fetch = match entry.status {
      QueryStatus::Success => entry.invalidated || is_expired(entry.fetched_at, stale_time),
      QueryStatus::Error => entry.invalidated,
      QueryStatus::Idle | QueryStatus::Pending => true,
    };

    if !needs_fetch {
      return FetchOutcome::Cached;
    }

    debug!(key = %key.description(), from = ?entry.status, "starting query");
    start(entry, fetcher());
    FetchOutcome::Started
  }

  /// Force a new request, dropping any request already in flight.
  pub fn refetch<F, Fut>(&mut self, key: &K, fetcher: F)
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchResult<V>> + Send + 'static,
  {
    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(CacheEntry::new);

    debug!(key = %key.description(), "refetching query");
    entry.in_flight = None;
    start(entry, fetcher());
  }

  /// Apply results of completed requests.
  ///
  /// Call this from the event loop tick. Failures are reported once, when
  /// they land, so callers can surface them.
  pub fn poll(&mut self) -> PollReport<K> {
    let mut report = PollReport::default();

    for (key, entry) in self.entries.iter_mut() {
      let receiver = match &mut entry.in_flight {
        Some(rx) => rx,
        None => continue,
      };

      let result = match receiver.try_recv() {
        Ok(result) => result,
        Err(oneshot::error::TryRecvError::Empty) => continue,
        Err(oneshot::error::TryRecvError::Closed) => {
          // Task dropped without sending (panicked or runtime shutting down)
          Err(ApiError::transport("query was cancelled"))
        }
      };

      entry.in_flight = None;

      match result {
        Ok(data) => {
          debug!(key = %key.description(), "query succeeded");
          entry.data = Some(data);
          entry.error = None;
          entry.status = QueryStatus::Success;
          entry.fetched_at = Some(Instant::now());
          entry.invalidated = false;
          report.succeeded += 1;
        }
        Err(error) => {
          debug!(key = %key.description(), %error, "query failed");
          entry.error = Some(error.clone());
          entry.status = QueryStatus::Error;
          entry.invalidated = false;
          report.failed.push((key.clone(), error));
        }
      }
    }

    report
  }

  /// Mark every entry of `kind` stale, regardless of freshness.
  ///
  /// Requests in flight for those entries are discarded: a response that
  /// started before the invalidation must never land. The next read of
  /// each key issues a new request. Returns the number of entries touched.
  pub fn invalidate_kind(&mut self, kind: K::Kind) -> usize {
    let mut count = 0;
    for (key, entry) in self.entries.iter_mut() {
      if key.kind() == kind {
        invalidate_entry(key, entry);
        count += 1;
      }
    }
    debug!(?kind, count, "invalidated query kind");
    count
  }

  /// Drop an entry entirely, including any request in flight
  pub fn remove(&mut self, key: &K) {
    self.entries.remove(key);
  }

  pub fn snapshot(&self, key: &K) -> QuerySnapshot<'_, V> {
    match self.entries.get(key) {
      Some(entry) => QuerySnapshot {
        status: entry.status,
        data: entry.data.as_ref(),
        error: entry.error.as_ref(),
        is_stale: entry.invalidated || is_expired(entry.fetched_at, self.stale_time),
      },
      None => QuerySnapshot::idle(),
    }
  }

  /// Whether any request is still in flight
  pub fn has_in_flight(&self) -> bool {
    self.entries.values().any(|e| e.in_flight.is_some())
  }
}

// Per-key accessors; views read whole snapshots instead
#[cfg(test)]
impl<K: QueryKey, V: Send + 'static> QueryCache<K, V> {
  fn invalidate(&mut self, key: &K) {
    if let Some(entry) = self.entries.get_mut(key) {
      invalidate_entry(key, entry);
    }
  }

  fn status(&self, key: &K) -> QueryStatus {
    self
      .entries
      .get(key)
      .map(|e| e.status)
      .unwrap_or(QueryStatus::Idle)
  }

  fn data(&self, key: &K) -> Option<&V> {
    self.entries.get(key).and_then(|e| e.data.as_ref())
  }

  fn error(&self, key: &K) -> Option<&ApiError> {
    self.entries.get(key).and_then(|e| e.error.as_ref())
  }

  fn is_stale(&self, key: &K) -> bool {
    self.snapshot(key).is_stale
  }

  fn is_fetching(&self, key: &K) -> bool {
    self
      .entries
      .get(key)
      .is_some_and(|e| e.in_flight.is_some())
  }
}

impl<K: QueryKey, V: Send + 'static> Default for QueryCache<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

fn is_expired(fetched_at: Option<Instant>, stale_time: Duration) -> bool {
  fetched_at
    .map(|t| t.elapsed() >= stale_time)
    .unwrap_or(true)
}

fn start<V, Fut>(entry: &mut CacheEntry<V>, future: Fut)
where
  V: Send + 'static,
  Fut: Future<Output = FetchResult<V>> + Send + 'static,
{
  let (tx, rx) = oneshot::channel();
  entry.in_flight = Some(rx);
  entry.status = QueryStatus::Pending;

  tokio::spawn(async move {
    let result = future.await;
    // Ignore send errors - the entry may have been invalidated meanwhile
    let _ = tx.send(result);
  });
}

fn invalidate_entry<K: QueryKey, V>(key: &K, entry: &mut CacheEntry<V>) {
  entry.invalidated = true;
  if entry.in_flight.take().is_some() {
    debug!(key = %key.description(), "discarding in-flight request");
    entry.status = entry.settled_status();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use tokio::sync::Notify;

  #[derive(Debug, Clone, PartialEq, Eq, Hash)]
  enum TestKey {
    Page(u32),
    Item(u64),
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  enum TestKind {
    Page,
    Item,
  }

  impl QueryKey for TestKey {
    type Kind = TestKind;

    fn kind(&self) -> TestKind {
      match self {
        TestKey::Page(_) => TestKind::Page,
        TestKey::Item(_) => TestKind::Item,
      }
    }

    fn description(&self) -> String {
      format!("{:?}", self)
    }
  }

  async fn settle<V: Send + 'static>(cache: &mut QueryCache<TestKey, V>) {
    for _ in 0..200 {
      cache.poll();
      if !cache.has_in_flight() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("queries did not settle");
  }

  fn counting(counter: &Arc<AtomicU32>, value: u32) -> impl Future<Output = FetchResult<u32>> {
    let counter = counter.clone();
    async move {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(value)
    }
  }

  #[tokio::test]
  async fn test_first_read_fetches_then_serves_cached() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut cache: QueryCache<TestKey, u32> = QueryCache::new();
    let key = TestKey::Page(1);

    assert_eq!(cache.status(&key), QueryStatus::Idle);
    assert_eq!(cache.fetch(&key, || counting(&calls, 7)), FetchOutcome::Started);
    assert_eq!(cache.status(&key), QueryStatus::Pending);

    settle(&mut cache).await;
    assert_eq!(cache.status(&key), QueryStatus::Success);
    assert_eq!(cache.data(&key), Some(&7));

    assert_eq!(cache.fetch(&key, || counting(&calls, 8)), FetchOutcome::Cached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_request() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut cache: QueryCache<TestKey, u32> = QueryCache::new();
    let key = TestKey::Page(1);

    assert_eq!(cache.fetch(&key, || counting(&calls, 1)), FetchOutcome::Started);
    assert_eq!(cache.fetch(&key, || counting(&calls, 2)), FetchOutcome::Shared);
    assert_eq!(cache.fetch(&key, || counting(&calls, 3)), FetchOutcome::Shared);

    settle(&mut cache).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.data(&key), Some(&1));
  }

  #[tokio::test]
  async fn test_stale_entry_refetches_and_keeps_old_value_meanwhile() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut cache: QueryCache<TestKey, u32> = QueryCache::new().with_stale_time(Duration::ZERO);
    let key = TestKey::Page(1);

    cache.fetch(&key, || counting(&calls, 1));
    settle(&mut cache).await;
    assert!(cache.is_stale(&key));

    assert_eq!(cache.fetch(&key, || counting(&calls, 2)), FetchOutcome::Started);
    // Stale value stays visible while the refetch is in flight
    assert_eq!(cache.status(&key), QueryStatus::Pending);
    assert_eq!(cache.data(&key), Some(&1));

    settle(&mut cache).await;
    assert_eq!(cache.data(&key), Some(&2));
  }

  #[tokio::test]
  async fn test_error_is_not_retried_until_invalidated() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut cache: QueryCache<TestKey, u32> = QueryCache::new();
    let key = TestKey::Item(5);

    let c = calls.clone();
    cache.fetch(&key, move || async move {
      c.fetch_add(1, Ordering::SeqCst);
      Err(ApiError::NotFound(5))
    });
    settle(&mut cache).await;
    assert_eq!(cache.status(&key), QueryStatus::Error);
    assert_eq!(cache.error(&key), Some(&ApiError::NotFound(5)));

    assert_eq!(cache.fetch(&key, || counting(&calls, 5)), FetchOutcome::Cached);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate(&key);
    assert_eq!(cache.fetch(&key, || counting(&calls, 5)), FetchOutcome::Started);
    settle(&mut cache).await;
    assert_eq!(cache.status(&key), QueryStatus::Success);
    assert_eq!(cache.error(&key), None);
  }

  #[tokio::test]
  async fn test_poll_reports_each_failure_once() {
    let mut cache: QueryCache<TestKey, u32> = QueryCache::new();
    cache.fetch(&TestKey::Item(3), || async { Err(ApiError::NotFound(3)) });
    cache.fetch(&TestKey::Page(1), || async { Ok(1) });

    let mut failed = Vec::new();
    let mut succeeded = 0;
    for _ in 0..200 {
      let report = cache.poll();
      succeeded += report.succeeded;
      failed.extend(report.failed);
      if !cache.has_in_flight() {
        break;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(succeeded, 1);
    assert_eq!(failed, vec![(TestKey::Item(3), ApiError::NotFound(3))]);
    assert!(!cache.poll().changed());
  }

  #[tokio::test]
  async fn test_invalidate_kind_marks_every_entry_of_that_kind() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut cache: QueryCache<TestKey, u32> = QueryCache::new();

    for page in 1..=3 {
      cache.fetch(&TestKey::Page(page), || counting(&calls, page));
    }
    cache.fetch(&TestKey::Item(9), || counting(&calls, 9));
    settle(&mut cache).await;

    assert_eq!(cache.invalidate_kind(TestKind::Page), 3);

    for page in 1..=3 {
      assert!(cache.is_stale(&TestKey::Page(page)));
      assert_eq!(
        cache.fetch(&TestKey::Page(page), || counting(&calls, page * 10)),
        FetchOutcome::Started
      );
    }
    assert!(!cache.is_stale(&TestKey::Item(9)));
    assert_eq!(
      cache.fetch(&TestKey::Item(9), || counting(&calls, 0)),
      FetchOutcome::Cached
    );

    settle(&mut cache).await;
    assert_eq!(cache.data(&TestKey::Page(2)), Some(&20));
  }

  #[tokio::test]
  async fn test_response_started_before_invalidation_is_discarded() {
    let mut cache: QueryCache<TestKey, &'static str> = QueryCache::new();
    let key = TestKey::Page(1);
    let release = Arc::new(Notify::new());

    let gate = release.clone();
    cache.fetch(&key, move || async move {
      gate.notified().await;
      Ok("before mutation")
    });
    assert!(cache.is_fetching(&key));

    cache.invalidate_kind(TestKind::Page);
    assert!(!cache.is_fetching(&key));
    assert_eq!(cache.status(&key), QueryStatus::Idle);

    // The next read must issue a new request rather than join the old one
    assert_eq!(
      cache.fetch(&key, || async { Ok("after mutation") }),
      FetchOutcome::Started
    );
    release.notify_one();

    settle(&mut cache).await;
    assert_eq!(cache.data(&key), Some(&"after mutation"));
  }

  #[tokio::test]
  async fn test_refetch_replaces_in_flight_request() {
    let mut cache: QueryCache<TestKey, u32> = QueryCache::new();
    let key = TestKey::Page(1);

    cache.fetch(&key, || async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok(1)
    });
    cache.refetch(&key, || async { Ok(2) });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cache.poll();
    assert_eq!(cache.data(&key), Some(&2));
  }

  #[tokio::test]
  async fn test_snapshot_of_unknown_key_is_idle() {
    let cache: QueryCache<TestKey, u32> = QueryCache::new();
    let snapshot = cache.snapshot(&TestKey::Page(4));
    assert_eq!(snapshot.status, QueryStatus::Idle);
    assert!(snapshot.data.is_none());
    assert!(snapshot.is_stale);
  }
}
