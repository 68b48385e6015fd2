use crate::cache::QueryStatus;
use crate::posts::NotificationKind;
use crate::ui::components::TextInput;
use ratatui::prelude::{Color, Modifier, Span, Style, Stylize};

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Title suffix describing a query's state, e.g. "(loading...)"
pub fn status_suffix(status: QueryStatus, is_stale: bool) -> &'static str {
  match status {
    QueryStatus::Idle => "",
    QueryStatus::Pending => "(loading...)",
    QueryStatus::Error => "(error)",
    QueryStatus::Success if is_stale => "(stale)",
    QueryStatus::Success => "",
  }
}

/// Spans for an input's text with a block cursor at the cursor position
pub fn input_spans(input: &TextInput) -> Vec<Span<'static>> {
  let cursor = input.cursor_position();
  let mut chars = input.value().chars();
  let before: String = chars.by_ref().take(cursor).collect();
  let at = chars.next().map(String::from).unwrap_or_else(|| " ".to_string());
  let after: String = chars.collect();

  vec![
    Span::raw(before),
    Span::styled(at, Style::default().add_modifier(Modifier::REVERSED)),
    Span::raw(after),
  ]
}

pub fn notification_style(kind: NotificationKind) -> Style {
  match kind {
    NotificationKind::Success => Style::default().fg(Color::Black).bg(Color::Green),
    NotificationKind::Error => Style::default().fg(Color::White).bg(Color::Red).bold(),
  }
}
