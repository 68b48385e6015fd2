use crate::api::types::{Post, PostFields};
use crate::config::ApiConfig;
use crate::error::ApiError;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP client for the remote posts collection.
///
/// Pure request/response: no caching and no retries. Cheap to clone, the
/// underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct PostsClient {
  http: reqwest::Client,
  base_url: Url,
}

impl PostsClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid API url {}: {}", config.url, e))?;
    if base_url.cannot_be_a_base() {
      return Err(eyre!("API url {} cannot be used as a base url", config.url));
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("postboard/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  /// Host part of the base url, for display
  pub fn host(&self) -> &str {
    self.base_url.host_str().unwrap_or("")
  }

  /// Fetch one page of posts in collection order.
  ///
  /// Page numbers are 1-based; the request offset is `(page - 1) * page_size`.
  pub async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<Post>, ApiError> {
    let mut url = self.endpoint(&["posts"]);
    url
      .query_pairs_mut()
      .append_pair("_start", &page_offset(page, page_size).to_string())
      .append_pair("_limit", &page_size.to_string());

    debug!(page, page_size, %url, "listing posts");
    let response = self.http.get(url).send().await?;
    let posts = check_status(response)?.json::<Vec<Post>>().await?;
    Ok(posts)
  }

  /// Fetch a single post by id
  pub async fn get_one(&self, id: u64) -> Result<Post, ApiError> {
    let url = self.endpoint(&["posts", &id.to_string()]);

    debug!(id, "fetching post");
    let response = self.http.get(url).send().await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Err(ApiError::NotFound(id));
    }
    let post = check_status(response)?.json::<Post>().await?;
    Ok(post)
  }

  /// Create a post; the returned post carries the server-assigned id
  pub async fn create(&self, fields: &PostFields) -> Result<Post, ApiError> {
    let url = self.endpoint(&["posts"]);

    debug!(title = %fields.title, "creating post");
    let response = self.http.post(url).json(fields).send().await?;
    let post = check_status(response)?.json::<Post>().await?;
    Ok(post)
  }

  /// Replace title, body and owner of an existing post
  pub async fn update(&self, id: u64, fields: &PostFields) -> Result<Post, ApiError> {
    let url = self.endpoint(&["posts", &id.to_string()]);

    debug!(id, "updating post");
    let response = self.http.put(url).json(fields).send().await?;
    let mut post = check_status(response)?.json::<Post>().await?;
    // Identifiers are immutable; never trust an echo that says otherwise
    post.id = id;
    Ok(post)
  }

  /// Delete a post by id
  pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
    let url = self.endpoint(&["posts", &id.to_string()]);

    debug!(id, "deleting post");
    let response = self.http.delete(url).send().await?;
    check_status(response)?;
    Ok(())
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // cannot_be_a_base urls are rejected in new()
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }
}

/// Offset of the first item on a 1-based page
pub fn page_offset(page: u32, page_size: u32) -> u64 {
  u64::from(page.saturating_sub(1)) * u64::from(page_size)
}

fn check_status(response: Response) -> Result<Response, ApiError> {
  let status = response.status();
  if status.is_success() {
    Ok(response)
  } else {
    Err(ApiError::status(
      status.as_u16(),
      status.canonical_reason().unwrap_or("unexpected status"),
    ))
  }
}
