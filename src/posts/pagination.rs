//! Current page number and clamped navigation.

use crate::persist::Slice;
use serde::{Deserialize, Serialize};

/// Persisted pagination position (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
  pub page: u32,
}

impl Default for PageState {
  fn default() -> Self {
    Self { page: 1 }
  }
}

impl Slice for PageState {
  const KEY: &'static str = "postboard.page";
  const VERSION: u32 = 1;
}

/// Page after `current`, or `None` when already on the last page
pub fn next_page(current: u32, total_pages: u32) -> Option<u32> {
  (current < total_pages).then(|| current + 1)
}

/// Page before `current`, or `None` when already on page 1
pub fn prev_page(current: u32) -> Option<u32> {
  (current > 1).then(|| current - 1)
}

/// Pull an arbitrary page number into `[1, total_pages]`
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
  page.clamp(1, total_pages.max(1))
}
