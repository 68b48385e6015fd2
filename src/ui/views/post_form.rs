use crate::posts::{Field, PostsController};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::input_spans;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Form for creating a new post.
///
/// Every keystroke is written through to the persisted draft, so closing
/// the form (or the app) never loses what was typed.
pub struct PostFormView {
  focus: Field,
  inputs: [TextInput; 3],
}

impl PostFormView {
  pub fn new(posts: &PostsController) -> Self {
    let draft = posts.draft();
    Self {
      focus: Field::Title,
      inputs: Field::ALL.map(|field| TextInput::with_value(draft.field(field))),
    }
  }

  fn index(field: Field) -> usize {
    match field {
      Field::Title => 0,
      Field::Body => 1,
      Field::UserId => 2,
    }
  }

  fn input(&self, field: Field) -> &TextInput {
    &self.inputs[Self::index(field)]
  }

  fn input_mut(&mut self, field: Field) -> &mut TextInput {
    &mut self.inputs[Self::index(field)]
  }

  /// Pick up draft changes made outside the form (cleared after create)
  fn sync_from_draft(&mut self, posts: &PostsController) {
    let draft = posts.draft();
    for field in Field::ALL {
      if self.input(field).value() != draft.field(field) {
        self.input_mut(field).set_value(draft.field(field));
      }
    }
  }

  fn render_field(&self, frame: &mut Frame, area: Rect, field: Field, posts: &PostsController) {
    let focused = self.focus == field;
    let error = posts.draft_errors().message(field);

    let border_color = match (focused, error.is_some()) {
      (_, true) => Color::Red,
      (true, false) => Color::Yellow,
      (false, false) => Color::DarkGray,
    };

    let block = Block::default()
      .title(format!(" {} ", field.label()))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border_color));

    let input = self.input(field);
    let spans = if focused {
      input_spans(input)
    } else {
      vec![Span::raw(input.value().to_string())]
    };

    let mut lines = vec![Line::from(spans)];
    if let Some(message) = error {
      lines.push(Line::from(Span::styled(
        message,
        Style::default().fg(Color::Red),
      )));
    }

    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }
}

impl View for PostFormView {
  fn handle_key(&mut self, key: KeyEvent, posts: &mut PostsController) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus = self.focus.next();
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = self.focus.prev();
        return ViewAction::None;
      }
      KeyCode::Char('x') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        posts.clear_draft();
        self.sync_from_draft(posts);
        self.focus = Field::Title;
        return ViewAction::None;
      }
      _ => {}
    }

    let field = self.focus;
    match self.input_mut(field).handle_key(key) {
      InputResult::Edited => {
        let value = self.input(field).value().to_string();
        posts.set_draft_field(field, value);
      }
      InputResult::Submitted => {
        if let Err(errors) = posts.submit_draft() {
          // Jump to the first field that needs fixing
          if let Some((first, _)) = errors.iter().next() {
            self.focus = first;
          }
        }
      }
      InputResult::Cancelled => return ViewAction::Pop,
      InputResult::Consumed | InputResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, posts: &PostsController) {
    let title = if posts.is_creating() {
      " New post (submitting...) "
    } else {
      " New post "
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4), // Title
        Constraint::Min(5),    // Body
        Constraint::Length(4), // User id
        Constraint::Length(1), // Help
      ])
      .split(inner);

    for (field, chunk) in Field::ALL.into_iter().zip(chunks.iter()) {
      self.render_field(frame, *chunk, field, posts);
    }

    let help = Paragraph::new("tab: next field   enter: submit   ctrl-x: clear   esc: back")
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
  }

  fn breadcrumb_label(&self) -> String {
    "New post".to_string()
  }

  fn tick(&mut self, posts: &mut PostsController) {
    self.sync_from_draft(posts);
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("tab", "next field").with_priority(10),
      ShortcutInfo::new("enter", "submit").with_priority(20),
      ShortcutInfo::new("esc", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::PostsClient;
  use crate::config::Config;
  use crate::persist::MemoryStore;
  use std::sync::Arc;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn controller() -> PostsController {
    let config = Config::default();
    let client = PostsClient::new(&config.api).unwrap();
    PostsController::new(client, Arc::new(MemoryStore::new()), &config)
  }

  #[tokio::test]
  async fn test_typing_writes_through_to_draft() {
    let mut posts = controller();
    let mut form = PostFormView::new(&posts);

    for c in "Hello".chars() {
      form.handle_key(key(KeyCode::Char(c)), &mut posts);
    }
    form.handle_key(key(KeyCode::Tab), &mut posts);
    form.handle_key(key(KeyCode::Char('b')), &mut posts);

    assert_eq!(posts.draft().title, "Hello");
    assert_eq!(posts.draft().body, "b");
  }

  #[tokio::test]
  async fn test_form_reopens_with_saved_draft() {
    let mut posts = controller();
    posts.set_draft_field(Field::UserId, "7");

    let form = PostFormView::new(&posts);
    assert_eq!(form.input(Field::UserId).value(), "7");
  }

  #[tokio::test]
  async fn test_invalid_submit_focuses_first_error() {
    let mut posts = controller();
    posts.set_draft_field(Field::Title, "Valid title");
    let mut form = PostFormView::new(&posts);
    form.focus = Field::UserId;

    form.handle_key(key(KeyCode::Enter), &mut posts);

    assert_eq!(form.focus, Field::Body);
    assert!(!posts.is_creating());
    assert!(posts.draft_errors().get(Field::Body).is_some());
  }

  #[tokio::test]
  async fn test_escape_pops_and_keeps_draft() {
    let mut posts = controller();
    let mut form = PostFormView::new(&posts);
    form.handle_key(key(KeyCode::Char('x')), &mut posts);

    assert!(matches!(
      form.handle_key(key(KeyCode::Esc), &mut posts),
      ViewAction::Pop
    ));
    assert_eq!(posts.draft().title, "x");
  }
}
