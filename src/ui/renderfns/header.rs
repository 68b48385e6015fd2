use crate::posts::Notification;
use crate::ui::renderfns::notification_style;
use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Everything the header shows, gathered by the app
pub struct HeaderContext<'a> {
  pub host: &'a str,
  pub page: u32,
  pub total_pages: u32,
  pub busy: bool,
  pub shortcuts: Vec<ShortcutInfo>,
  pub notification: Option<&'a Notification>,
}

/// Draw the header bar with logo, context, shortcuts and the latest
/// notification
pub fn draw_header(frame: &mut Frame, area: Rect, ctx: &HeaderContext<'_>) {
  let mut spans = vec![
    Span::styled(" postboard ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", ctx.host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" page {}/{} ", ctx.page, ctx.total_pages),
      Style::default().fg(Color::Yellow).bold(),
    ),
  ];

  if ctx.busy {
    spans.push(Span::styled("⟳ ", Style::default().fg(Color::DarkGray)));
  }
  spans.push(Span::raw(" "));

  let mut shortcuts = ctx.shortcuts.clone();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    // Shortcuts - keys highlighted, descriptions dimmed
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}  ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);

  if let Some(notification) = ctx.notification {
    let text = format!(" {} ", notification.message);
    let width = (text.chars().count() as u16).min(area.width);
    let right = Rect::new(area.x + area.width - width, area.y, width, 1);
    frame.render_widget(
      Paragraph::new(text).style(notification_style(notification.kind)),
      right,
    );
  }
}
