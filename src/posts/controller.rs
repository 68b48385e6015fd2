//! Coordination between views, the query cache and persisted state.
//!
//! Views call into [`PostsController`] with intents (read a page, submit
//! the draft, delete a post, change page). Writes run as spawned tasks;
//! their outcomes are applied in [`PostsController::poll`] on the UI task,
//! which is the only place cache invalidation happens.

use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::form::{Draft, Field, ValidationErrors};
use super::notifications::Notifications;
use super::pagination::{clamp_page, next_page, prev_page, PageState};
use super::queries::{PostQueries, PostQueryKey, PostQueryKind};
use crate::api::{Post, PostsClient};
use crate::cache::{FetchOutcome, QueryKey, QuerySnapshot};
use crate::config::Config;
use crate::error::ApiError;
use crate::persist::{KeyValueStore, Persisted};

/// A write that is in flight. At most one per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Mutation {
  Create,
  Update { id: u64 },
  Delete { id: u64 },
}

/// The post a write returned, if any (deletes return nothing)
type MutationResult = Result<Option<Post>, ApiError>;

#[derive(Debug)]
struct MutationOutcome {
  mutation: Mutation,
  result: MutationResult,
}

pub struct PostsController {
  client: PostsClient,
  queries: PostQueries,
  draft: Persisted<Draft>,
  draft_errors: ValidationErrors,
  /// Draft as it was when the in-flight create was sent
  submitted: Option<Draft>,
  pagination: Persisted<PageState>,
  total_pages: u32,
  /// Posts in inline edit mode with their edit buffers. Never persisted.
  editing: HashMap<u64, Draft>,
  edit_errors: HashMap<u64, ValidationErrors>,
  notifications: Notifications,
  pending: HashSet<Mutation>,
  outcome_tx: mpsc::UnboundedSender<MutationOutcome>,
  outcome_rx: mpsc::UnboundedReceiver<MutationOutcome>,
}

impl PostsController {
  pub fn new(client: PostsClient, store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
    let queries = PostQueries::new(
      client.clone(),
      config.pagination.page_size,
      config.cache.stale_time(),
    );
    let draft = Persisted::load(store.clone());
    let mut pagination: Persisted<PageState> = Persisted::load(store);
    let total_pages = config.pagination.total_pages();

    // A stored page can only be out of range if the configured size changed
    let page = pagination.read().page;
    let clamped = clamp_page(page, total_pages);
    if clamped != page {
      warn!(page, clamped, total_pages, "stored page out of range");
      persist_or_warn(pagination.write(PageState { page: clamped }));
    }

    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

    Self {
      client,
      queries,
      draft,
      draft_errors: ValidationErrors::default(),
      submitted: None,
      pagination,
      total_pages,
      editing: HashMap::new(),
      edit_errors: HashMap::new(),
      notifications: Notifications::default(),
      pending: HashSet::new(),
      outcome_tx,
      outcome_rx,
    }
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub fn current_page(&self) -> u32 {
    self.pagination.read().page
  }

  /// Fixed page count; not recomputed after creates or deletes
  pub fn total_pages(&self) -> u32 {
    self.total_pages
  }

  /// Read intent for the current page
  pub fn load_current_page(&mut self) -> FetchOutcome {
    let page = self.current_page();
    self.queries.list_page(page)
  }

  pub fn refresh_current_page(&mut self) {
    let page = self.current_page();
    self.queries.refresh_page(page);
  }

  pub fn current_page_posts(&self) -> QuerySnapshot<'_, Vec<Post>> {
    self.queries.page(self.current_page())
  }

  /// Read intent for a single post
  pub fn load_post(&mut self, id: u64) -> FetchOutcome {
    self.queries.post(id)
  }

  pub fn refresh_post(&mut self, id: u64) {
    self.queries.refresh_post(id);
  }

  pub fn post(&self, id: u64) -> QuerySnapshot<'_, Post> {
    self.queries.detail(id)
  }

  #[cfg(test)]
  pub fn queries(&self) -> &PostQueries {
    &self.queries
  }

  pub fn host(&self) -> &str {
    self.client.host()
  }

  // ==========================================================================
  // Pagination
  // ==========================================================================

  /// Move to the next page. No-op on the last page.
  pub fn next_page(&mut self) -> bool {
    match next_page(self.current_page(), self.total_pages) {
      Some(page) => self.set_page(page),
      None => false,
    }
  }

  /// Move to the previous page. No-op on page 1.
  pub fn prev_page(&mut self) -> bool {
    match prev_page(self.current_page()) {
      Some(page) => self.set_page(page),
      None => false,
    }
  }

  /// Jump to a page; out-of-range pages are clamped
  pub fn go_to_page(&mut self, page: u32) -> bool {
    let page = clamp_page(page, self.total_pages);
    if page == self.current_page() {
      return false;
    }
    self.set_page(page)
  }

  fn set_page(&mut self, page: u32) -> bool {
    persist_or_warn(self.pagination.write(PageState { page }));
    true
  }

  // ==========================================================================
  // Draft form
  // ==========================================================================

  pub fn draft(&self) -> &Draft {
    self.draft.read()
  }

  pub fn draft_errors(&self) -> &ValidationErrors {
    &self.draft_errors
  }

  /// Change one draft field; persisted immediately
  pub fn edit_draft(&mut self, field: Field, f: impl FnOnce(&mut String)) {
    persist_or_warn(self.draft.update(|draft| f(draft.field_mut(field))));
  }

  pub fn set_draft_field(&mut self, field: Field, value: impl Into<String>) {
    let value = value.into();
    self.edit_draft(field, |s| *s = value);
  }

  pub fn clear_draft(&mut self) {
    persist_or_warn(self.draft.clear());
    self.draft_errors = ValidationErrors::default();
  }

  pub fn is_creating(&self) -> bool {
    self.pending.contains(&Mutation::Create)
  }

  /// Validate the draft and, if valid, start creating the post.
  ///
  /// Invalid drafts never reach the remote API. On success the list kind is
  /// invalidated and the draft cleared, unless it was edited while the
  /// create was in flight; the current page is left alone. A submit while
  /// a create is already in flight is ignored.
  pub fn submit_draft(&mut self) -> Result<(), ValidationErrors> {
    let fields = match self.draft.read().to_fields() {
      Ok(fields) => fields,
      Err(errors) => {
        self.draft_errors = errors.clone();
        return Err(errors);
      }
    };
    self.draft_errors = ValidationErrors::default();

    if self.is_creating() {
      info!("create already in flight, ignoring submit");
      return Ok(());
    }
    self.submitted = Some(self.draft.read().clone());

    let client = self.client.clone();
    let future = async move { client.create(&fields).await.map(Some) }.boxed();
    self.spawn(Mutation::Create, future);
    Ok(())
  }

  // ==========================================================================
  // Inline edit
  // ==========================================================================

  /// Enter edit mode for a post, seeding the buffer from its current fields
  pub fn start_edit(&mut self, post: &Post) {
    self
      .editing
      .entry(post.id)
      .or_insert_with(|| Draft::from_fields(&post.fields()));
  }

  pub fn cancel_edit(&mut self, id: u64) {
    self.editing.remove(&id);
    self.edit_errors.remove(&id);
  }

  pub fn is_editing(&self, id: u64) -> bool {
    self.editing.contains_key(&id)
  }

  pub fn edit_buffer(&self, id: u64) -> Option<&Draft> {
    self.editing.get(&id)
  }

  pub fn edit_buffer_mut(&mut self, id: u64) -> Option<&mut Draft> {
    self.editing.get_mut(&id)
  }

  pub fn edit_errors(&self, id: u64) -> Option<&ValidationErrors> {
    self.edit_errors.get(&id)
  }

  pub fn is_saving(&self, id: u64) -> bool {
    self.pending.contains(&Mutation::Update { id })
  }

  /// Validate the edit buffer and start a full-replace update
  pub fn save_edit(&mut self, id: u64) -> Result<(), ValidationErrors> {
    let Some(buffer) = self.editing.get(&id) else {
      return Ok(());
    };
    let fields = match buffer.to_fields() {
      Ok(fields) => fields,
      Err(errors) => {
        self.edit_errors.insert(id, errors.clone());
        return Err(errors);
      }
    };
    self.edit_errors.remove(&id);

    let client = self.client.clone();
    let future = async move { client.update(id, &fields).await.map(Some) }.boxed();
    self.spawn(Mutation::Update { id }, future);
    Ok(())
  }

  // ==========================================================================
  // Delete
  // ==========================================================================

  pub fn is_deleting(&self, id: u64) -> bool {
    self.pending.contains(&Mutation::Delete { id })
  }

  /// Start deleting a post. On success every list page is invalidated,
  /// since offsets shift.
  pub fn delete_post(&mut self, id: u64) {
    let client = self.client.clone();
    let future = async move { client.delete(id).await.map(|()| None) }.boxed();
    self.spawn(Mutation::Delete { id }, future);
  }

  // ==========================================================================
  // Event loop
  // ==========================================================================

  /// Apply completed reads and writes. Returns `true` if anything changed.
  ///
  /// Failed reads keep whatever value the entry had, so they are also
  /// raised as notifications.
  pub fn poll(&mut self) -> bool {
    let report = self.queries.poll();
    let mut changed = report.changed();

    for (key, error) in report.failed {
      warn!(query = %key.description(), %error, "read failed");
      self.notifications.error(read_failure_message(&key, &error));
    }

    while let Ok(outcome) = self.outcome_rx.try_recv() {
      self.pending.remove(&outcome.mutation);
      self.apply(outcome);
      changed = true;
    }

    changed | self.notifications.expire()
  }

  /// Whether any read or write is still in flight
  pub fn is_busy(&self) -> bool {
    !self.pending.is_empty() || self.queries.has_in_flight()
  }

  pub fn notifications(&self) -> &Notifications {
    &self.notifications
  }

  fn spawn(&mut self, mutation: Mutation, future: BoxFuture<'static, MutationResult>) {
    if !self.pending.insert(mutation) {
      info!(?mutation, "mutation already in flight, ignoring");
      return;
    }

    let tx = self.outcome_tx.clone();
    tokio::spawn(async move {
      let result = future.await;
      let _ = tx.send(MutationOutcome { mutation, result });
    });
  }

  fn apply(&mut self, outcome: MutationOutcome) {
    let MutationOutcome { mutation, result } = outcome;

    let post = match result {
      Ok(post) => post,
      Err(error) => {
        // Failed writes leave every cache entry and slice untouched
        warn!(?mutation, %error, "mutation failed");
        if mutation == Mutation::Create {
          self.submitted = None;
        }
        self.notifications.error(failure_message(mutation, &error));
        return;
      }
    };

    match mutation {
      Mutation::Create => {
        let id = post.map(|p| p.id).unwrap_or_default();
        info!(id, "post created");
        self.queries.invalidate(PostQueryKind::List);
        let submitted = self.submitted.take();
        if submitted.as_ref() == Some(self.draft.read()) {
          self.clear_draft();
        } else {
          info!(id, "draft changed while creating, keeping it");
        }
        self.notifications.success(format!("Created post #{}", id));
      }
      Mutation::Update { id } => {
        info!(id, "post updated");
        self.queries.invalidate(PostQueryKind::List);
        self.queries.invalidate(PostQueryKind::Detail);
        self.cancel_edit(id);
        self.notifications.success(format!("Updated post #{}", id));
      }
      Mutation::Delete { id } => {
        info!(id, "post deleted");
        self.queries.invalidate(PostQueryKind::List);
        self.queries.forget_post(id);
        self.cancel_edit(id);
        self.notifications.success(format!("Deleted post #{}", id));
      }
    }
  }
}

fn read_failure_message(key: &PostQueryKey, error: &ApiError) -> String {
  match key {
    PostQueryKey::List { page, .. } => format!("Could not load page {}: {}", page, error),
    PostQueryKey::Detail { id } if error.is_not_found() => format!("Post #{} does not exist", id),
    PostQueryKey::Detail { id } => format!("Could not load post #{}: {}", id, error),
  }
}

fn failure_message(mutation: Mutation, error: &ApiError) -> String {
  match mutation {
    Mutation::Create => format!("Could not create post: {}", error),
    Mutation::Update { id } => format!("Could not update post #{}: {}", id, error),
    Mutation::Delete { id } => format!("Could not delete post #{}: {}", id, error),
  }
}

/// Slice writes are fire-and-forget; the in-memory value is already updated
fn persist_or_warn(result: color_eyre::Result<()>) {
  if let Err(e) = result {
    warn!(error = %e, "failed to persist state");
  }
}
