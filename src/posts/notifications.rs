//! Transient success/error messages shown after mutations.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MAX_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
  Success,
  Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub kind: NotificationKind,
  pub message: String,
  created_at: Instant,
}

/// Bounded queue of notifications that expire after a fixed time
#[derive(Debug)]
pub struct Notifications {
  items: VecDeque<Notification>,
  ttl: Duration,
}

impl Notifications {
  pub fn new(ttl: Duration) -> Self {
    Self {
      items: VecDeque::new(),
      ttl,
    }
  }

  pub fn success(&mut self, message: impl Into<String>) {
    self.push(NotificationKind::Success, message.into());
  }

  pub fn error(&mut self, message: impl Into<String>) {
    self.push(NotificationKind::Error, message.into());
  }

  fn push(&mut self, kind: NotificationKind, message: String) {
    if self.items.len() == MAX_NOTIFICATIONS {
      self.items.pop_front();
    }
    self.items.push_back(Notification {
      kind,
      message,
      created_at: Instant::now(),
    });
  }

  /// Drop expired notifications. Returns `true` if any were removed.
  pub fn expire(&mut self) -> bool {
    let before = self.items.len();
    let ttl = self.ttl;
    self.items.retain(|n| n.created_at.elapsed() < ttl);
    self.items.len() != before
  }

  /// Most recent notification still on screen
  pub fn latest(&self) -> Option<&Notification> {
    self.items.back()
  }

  #[cfg(test)]
  pub fn iter(&self) -> impl Iterator<Item = &Notification> {
    self.items.iter()
  }
}

impl Default for Notifications {
  fn default() -> Self {
    Self::new(Duration::from_secs(4))
  }
}
