use crate::api::Post;
use crate::posts::{Field, PostsController};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::{input_spans, status_suffix, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{PostDetailView, PostFormView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Inline edit session for one row
struct InlineEdit {
  id: u64,
  field: Field,
  input: TextInput,
}

/// Paginated list of posts with inline edit and delete
pub struct PostListView {
  list_state: ListState,
  edit: Option<InlineEdit>,
  /// Post awaiting a second `d` to confirm deletion
  confirm_delete: Option<u64>,
}

impl PostListView {
  pub fn new() -> Self {
    Self {
      list_state: ListState::default(),
      edit: None,
      confirm_delete: None,
    }
  }

  fn selected_post(&self, posts: &PostsController) -> Option<Post> {
    let idx = self.list_state.selected()?;
    posts
      .current_page_posts()
      .data
      .and_then(|page| page.get(idx).cloned())
  }

  fn change_page(&mut self, moved: bool) {
    if moved {
      self.list_state.select(Some(0));
      self.confirm_delete = None;
    }
  }

  fn begin_edit(&mut self, posts: &mut PostsController) {
    let Some(post) = self.selected_post(posts) else {
      return;
    };
    posts.start_edit(&post);
    let value = posts
      .edit_buffer(post.id)
      .map(|draft| draft.field(Field::Title).to_string())
      .unwrap_or_default();
    self.edit = Some(InlineEdit {
      id: post.id,
      field: Field::Title,
      input: TextInput::with_value(&value),
    });
  }

  fn focus_field(edit: &mut InlineEdit, posts: &PostsController, field: Field) {
    edit.field = field;
    let value = posts
      .edit_buffer(edit.id)
      .map(|draft| draft.field(field).to_string())
      .unwrap_or_default();
    edit.input.set_value(&value);
  }

  fn handle_edit_key(&mut self, key: KeyEvent, posts: &mut PostsController) {
    let Some(edit) = self.edit.as_mut() else {
      return;
    };

    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        let next = edit.field.next();
        Self::focus_field(edit, posts, next);
        return;
      }
      KeyCode::BackTab | KeyCode::Up => {
        let prev = edit.field.prev();
        Self::focus_field(edit, posts, prev);
        return;
      }
      _ => {}
    }

    match edit.input.handle_key(key) {
      InputResult::Edited => {
        if let Some(buffer) = posts.edit_buffer_mut(edit.id) {
          *buffer.field_mut(edit.field) = edit.input.value().to_string();
        }
      }
      InputResult::Submitted => {
        // Validation errors are shown inline; stay in edit mode either way
        // until the update succeeds
        let _ = posts.save_edit(edit.id);
      }
      InputResult::Cancelled => {
        posts.cancel_edit(edit.id);
        self.edit = None;
      }
      InputResult::Consumed | InputResult::NotHandled => {}
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect, posts: &PostsController) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    let snapshot = posts.current_page_posts();
    let page_posts: &[Post] = snapshot.data.map(|v| v.as_slice()).unwrap_or(&[]);

    let title = format!(
      " Posts {} ",
      status_suffix(snapshot.status, snapshot.is_stale)
    );
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if page_posts.is_empty() {
      let content = match snapshot.error {
        Some(error) => format!("Failed to load posts: {}\n\nPress 'r' to retry.", error),
        None if snapshot.is_loading() => "Loading posts...".to_string(),
        None => "No posts on this page.".to_string(),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[0]);
    } else {
      let len = page_posts.len();
      match self.list_state.selected() {
        Some(i) if i < len => {}
        _ => self.list_state.select(Some(0)),
      }

      let items: Vec<ListItem> = page_posts
        .iter()
        .map(|post| self.render_row(post, posts))
        .collect();

      let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

      frame.render_stateful_widget(list, chunks[0], &mut self.list_state);
    }

    render_pager(frame, chunks[1], posts.current_page(), posts.total_pages());
  }

  fn render_row(&self, post: &Post, posts: &PostsController) -> ListItem<'static> {
    let mut marker = String::new();
    if posts.is_deleting(post.id) {
      marker.push_str(" [deleting...]");
    } else if self.confirm_delete == Some(post.id) {
      marker.push_str(" [press d again to delete]");
    }
    if posts.is_saving(post.id) {
      marker.push_str(" [saving...]");
    }

    let header = Line::from(vec![
      Span::styled(format!("#{:<4}", post.id), Style::default().fg(Color::Cyan)),
      Span::raw(" "),
      Span::styled(
        truncate(&post.title, 60),
        Style::default().add_modifier(Modifier::BOLD),
      ),
      Span::styled(
        format!("  (user {})", post.user_id),
        Style::default().fg(Color::DarkGray),
      ),
      Span::styled(marker, Style::default().fg(Color::Yellow)),
    ]);

    let buffer = match posts.edit_buffer(post.id) {
      Some(buffer) => buffer,
      None => {
        let preview = Line::from(Span::styled(
          format!("      {}", truncate(&post.body.replace('\n', " "), 80)),
          Style::default().fg(Color::Gray),
        ));
        return ListItem::new(vec![header, preview]);
      }
    };

    let mut lines = vec![header];
    let errors = posts.edit_errors(post.id);
    for field in Field::ALL {
      let focused_input = self
        .edit
        .as_ref()
        .filter(|e| e.id == post.id && e.field == field)
        .map(|e| &e.input);
      let label_style = if focused_input.is_some() {
        Style::default().fg(Color::Yellow)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      let mut spans = vec![Span::styled(
        format!("      {:<8} ", field.label()),
        label_style,
      )];
      match focused_input {
        Some(input) => spans.extend(input_spans(input)),
        None => spans.push(Span::raw(truncate(
          &buffer.field(field).replace('\n', " "),
          70,
        ))),
      }
      lines.push(Line::from(spans));

      if let Some(message) = errors.and_then(|e| e.message(field)) {
        lines.push(Line::from(Span::styled(
          format!("               {}", message),
          Style::default().fg(Color::Red),
        )));
      }
    }

    ListItem::new(lines)
  }
}

impl Default for PostListView {
  fn default() -> Self {
    Self::new()
  }
}

fn render_pager(frame: &mut Frame, area: Rect, page: u32, total_pages: u32) {
  let enabled = Style::default().fg(Color::Cyan);
  let disabled = Style::default().fg(Color::DarkGray);

  let line = Line::from(vec![
    Span::styled(" ◀ Previous ", if page > 1 { enabled } else { disabled }),
    Span::raw(format!(" Page {} of {} ", page, total_pages)),
    Span::styled(" Next ▶ ", if page < total_pages { enabled } else { disabled }),
  ]);
  frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

impl View for PostListView {
  fn handle_key(&mut self, key: KeyEvent, posts: &mut PostsController) -> ViewAction {
    if let Some(edit) = &self.edit {
      // Edit mode ends when the update lands or the post disappears
      if posts.is_editing(edit.id) {
        self.handle_edit_key(key, posts);
        return ViewAction::None;
      }
      self.edit = None;
    }

    let pending_delete = self.confirm_delete.take();

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('h') | KeyCode::Left => {
        let moved = posts.prev_page();
        self.change_page(moved);
      }
      KeyCode::Char('l') | KeyCode::Right => {
        let moved = posts.next_page();
        self.change_page(moved);
      }
      KeyCode::Char('r') => posts.refresh_current_page(),
      KeyCode::Char('n') => return ViewAction::Push(Box::new(PostFormView::new(posts))),
      KeyCode::Char('e') => self.begin_edit(posts),
      KeyCode::Char('d') => {
        if let Some(post) = self.selected_post(posts) {
          if pending_delete == Some(post.id) {
            posts.delete_post(post.id);
          } else {
            self.confirm_delete = Some(post.id);
          }
        }
      }
      KeyCode::Enter => {
        if let Some(post) = self.selected_post(posts) {
          return ViewAction::Push(Box::new(PostDetailView::new(post.id)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, posts: &PostsController) {
    self.render_list(frame, area, posts);
  }

  fn breadcrumb_label(&self) -> String {
    "Posts".to_string()
  }

  fn tick(&mut self, posts: &mut PostsController) {
    posts.load_current_page();
    if let Some(edit) = &self.edit {
      if !posts.is_editing(edit.id) {
        self.edit = None;
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.edit.is_some()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.edit.is_some() {
      return vec![
        ShortcutInfo::new("tab", "next field").with_priority(10),
        ShortcutInfo::new("enter", "save").with_priority(20),
        ShortcutInfo::new("esc", "cancel").with_priority(30),
      ];
    }
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("h/l", "page").with_priority(20),
      ShortcutInfo::new("n", "new").with_priority(30),
      ShortcutInfo::new("e", "edit").with_priority(40),
      ShortcutInfo::new("d", "delete").with_priority(50),
      ShortcutInfo::new("r", "refresh").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
