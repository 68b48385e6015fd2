//! Query keys and the cached read side of the posts collection.

use std::time::Duration;

use crate::api::{Post, PostsClient};
use crate::cache::{FetchOutcome, PollReport, QueryCache, QueryKey, QuerySnapshot};

/// Query key types for post reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostQueryKey {
  /// One page of the collection
  List { page: u32, page_size: u32 },
  /// A single post by id
  Detail { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostQueryKind {
  List,
  Detail,
}

impl QueryKey for PostQueryKey {
  type Kind = PostQueryKind;

  fn kind(&self) -> PostQueryKind {
    match self {
      Self::List { .. } => PostQueryKind::List,
      Self::Detail { .. } => PostQueryKind::Detail,
    }
  }

  fn description(&self) -> String {
    match self {
      Self::List { page, page_size } => format!("posts page {} (size {})", page, page_size),
      Self::Detail { id } => format!("post {}", id),
    }
  }
}

/// Cached reads over [`PostsClient`].
///
/// List pages and single posts live in separate caches because their
/// values differ in type; invalidation is routed by kind.
pub struct PostQueries {
  client: PostsClient,
  page_size: u32,
  lists: QueryCache<PostQueryKey, Vec<Post>>,
  details: QueryCache<PostQueryKey, Post>,
}

impl PostQueries {
  pub fn new(client: PostsClient, page_size: u32, stale_time: Duration) -> Self {
    Self {
      client,
      page_size,
      lists: QueryCache::new().with_stale_time(stale_time),
      details: QueryCache::new().with_stale_time(stale_time),
    }
  }

  pub fn list_key(&self, page: u32) -> PostQueryKey {
    PostQueryKey::List {
      page,
      page_size: self.page_size,
    }
  }

  /// Read intent for one page
  pub fn list_page(&mut self, page: u32) -> FetchOutcome {
    let key = self.list_key(page);
    let client = self.client.clone();
    let page_size = self.page_size;
    self
      .lists
      .fetch(&key, move || async move { client.list_page(page, page_size).await })
  }

  /// Refetch one page even if fresh
  pub fn refresh_page(&mut self, page: u32) {
    let key = self.list_key(page);
    let client = self.client.clone();
    let page_size = self.page_size;
    self
      .lists
      .refetch(&key, move || async move { client.list_page(page, page_size).await });
  }

  pub fn page(&self, page: u32) -> QuerySnapshot<'_, Vec<Post>> {
    self.lists.snapshot(&self.list_key(page))
  }

  /// Read intent for a single post
  pub fn post(&mut self, id: u64) -> FetchOutcome {
    let client = self.client.clone();
    self
      .details
      .fetch(&PostQueryKey::Detail { id }, move || async move {
        client.get_one(id).await
      })
  }

  pub fn refresh_post(&mut self, id: u64) {
    let client = self.client.clone();
    self
      .details
      .refetch(&PostQueryKey::Detail { id }, move || async move {
        client.get_one(id).await
      });
  }

  pub fn detail(&self, id: u64) -> QuerySnapshot<'_, Post> {
    self.details.snapshot(&PostQueryKey::Detail { id })
  }

  /// Mark every entry of `kind` stale. Returns the number of entries touched.
  pub fn invalidate(&mut self, kind: PostQueryKind) -> usize {
    match kind {
      PostQueryKind::List => self.lists.invalidate_kind(kind),
      PostQueryKind::Detail => self.details.invalidate_kind(kind),
    }
  }

  /// Forget a post that no longer exists
  pub fn forget_post(&mut self, id: u64) {
    self.details.remove(&PostQueryKey::Detail { id });
  }

  /// Apply completed reads from both caches
  pub fn poll(&mut self) -> PollReport<PostQueryKey> {
    self.lists.poll().merge(self.details.poll())
  }

  pub fn has_in_flight(&self) -> bool {
    self.lists.has_in_flight() || self.details.has_in_flight()
  }

  #[cfg(test)]
  pub fn is_list_stale(&self, page: u32) -> bool {
    self.page(page).is_stale
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryStatus;
  use crate::config::ApiConfig;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  async fn settle(queries: &mut PostQueries) {
    for _ in 0..200 {
      queries.poll();
      if !queries.has_in_flight() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("queries did not settle");
  }

  fn queries_for(server: &MockServer) -> PostQueries {
    let client = PostsClient::new(&ApiConfig {
      url: server.uri(),
      timeout_secs: 5,
    })
    .unwrap();
    PostQueries::new(client, 5, Duration::from_secs(300))
  }

  fn page_json(first_id: u64) -> serde_json::Value {
    let posts: Vec<_> = (first_id..first_id + 5)
      .map(|id| {
        serde_json::json!({
          "userId": 1,
          "id": id,
          "title": format!("post {}", id),
          "body": "body text for this post",
        })
      })
      .collect();
    serde_json::Value::Array(posts)
  }

  #[test]
  fn test_key_kinds() {
    assert_eq!(
      PostQueryKey::List {
        page: 1,
        page_size: 5
      }
      .kind(),
      PostQueryKind::List
    );
    assert_eq!(PostQueryKey::Detail { id: 1 }.kind(), PostQueryKind::Detail);
  }

  #[tokio::test]
  async fn test_fresh_page_is_served_without_second_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/posts"))
      .and(query_param("_start", "5"))
      .respond_with(ResponseTemplate::new(200).set_body_json(page_json(6)))
      .expect(1)
      .mount(&server)
      .await;

    let mut queries = queries_for(&server);
    assert_eq!(queries.list_page(2), FetchOutcome::Started);
    assert_eq!(queries.list_page(2), FetchOutcome::Shared);
    settle(&mut queries).await;

    assert_eq!(queries.list_page(2), FetchOutcome::Cached);
    let snapshot = queries.page(2);
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(snapshot.data.map(|p| p[0].id), Some(6));
  }

  #[tokio::test]
  async fn test_invalidating_lists_leaves_details_fresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/posts"))
      .respond_with(ResponseTemplate::new(200).set_body_json(page_json(1)))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/posts/1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "userId": 1, "id": 1, "title": "post 1", "body": "body text for this post"
      })))
      .mount(&server)
      .await;

    let mut queries = queries_for(&server);
    queries.list_page(1);
    queries.list_page(2);
    queries.post(1);
    settle(&mut queries).await;

    assert_eq!(queries.invalidate(PostQueryKind::List), 2);
    assert!(queries.is_list_stale(1));
    assert!(queries.is_list_stale(2));
    assert!(!queries.detail(1).is_stale);
  }
}
