pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::posts::PostsController;
use components::CommandInput;
use ratatui::prelude::*;
use renderfns::{draw_footer, draw_header, HeaderContext};
use view::View;

/// Main draw function: header, active view, footer, then the command
/// overlay on top
pub fn draw(
  frame: &mut Frame,
  views: &mut [Box<dyn View>],
  posts: &PostsController,
  command: &CommandInput,
  hint: Option<&str>,
) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let breadcrumb: Vec<String> = views.iter().map(|v| v.breadcrumb_label()).collect();

  if let Some(view) = views.last_mut() {
    let ctx = HeaderContext {
      host: posts.host(),
      page: posts.current_page(),
      total_pages: posts.total_pages(),
      busy: posts.is_busy(),
      shortcuts: view.shortcuts(),
      notification: posts.notifications().latest(),
    };
    draw_header(frame, chunks[0], &ctx);
    view.render(frame, chunks[1], posts);
  }

  draw_footer(frame, chunks[2], &breadcrumb, hint);
  command.render_overlay(frame, chunks[1]);
}
