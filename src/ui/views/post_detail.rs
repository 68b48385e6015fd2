use crate::posts::PostsController;
use crate::ui::renderfns::status_suffix;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// View for displaying a single post
pub struct PostDetailView {
  id: u64,
}

impl PostDetailView {
  pub fn new(id: u64) -> Self {
    Self { id }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect, posts: &PostsController) {
    let snapshot = posts.post(self.id);
    let title = format!(
      " Post #{} {} ",
      self.id,
      status_suffix(snapshot.status, snapshot.is_stale)
    );

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let post = match (snapshot.data, snapshot.error) {
      (Some(post), _) => post,
      (None, Some(error)) => {
        let message = if error.is_not_found() {
          format!("Post #{} does not exist.", self.id)
        } else {
          format!("Error: {}\n\nPress 'r' to retry.", error)
        };
        let paragraph = Paragraph::new(message).style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, inner);
        return;
      }
      (None, None) => {
        let paragraph =
          Paragraph::new("Loading post...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2), // Title and author
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Body
      ])
      .split(inner);

    let header = vec![
      Line::from(vec![
        Span::styled("Title: ", Style::default().fg(Color::DarkGray)),
        Span::styled(&post.title, Style::default().add_modifier(Modifier::BOLD)),
      ]),
      Line::from(vec![
        Span::styled("User: ", Style::default().fg(Color::DarkGray)),
        Span::styled(post.user_id.to_string(), Style::default().fg(Color::Yellow)),
      ]),
    ];
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let sep =
      Paragraph::new("─".repeat(chunks[1].width as usize)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let body = Paragraph::new(post.body.as_str()).wrap(Wrap { trim: true });
    frame.render_widget(body, chunks[2]);
  }
}

impl View for PostDetailView {
  fn handle_key(&mut self, key: KeyEvent, posts: &mut PostsController) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        posts.refresh_post(self.id);
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, posts: &PostsController) {
    self.render_detail(frame, area, posts);
  }

  fn breadcrumb_label(&self) -> String {
    format!("#{}", self.id)
  }

  fn tick(&mut self, posts: &mut PostsController) {
    posts.load_post(self.id);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
