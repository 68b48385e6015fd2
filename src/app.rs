use crate::commands::CommandAction;
use crate::event::{Event, EventHandler};
use crate::posts::PostsController;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{PostFormView, PostListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command: CommandInput,

  /// Shared state lent to the active view
  posts: PostsController,

  /// One-shot footer message, cleared on the next key
  hint: Option<String>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(posts: PostsController) -> Self {
    Self {
      view_stack: vec![Box::new(PostListView::new())],
      command: CommandInput::new(),
      posts,
      hint: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Cleanup terminal, even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    // Issue the first read intent before the first frame
    self.tick();

    while !self.should_quit {
      terminal.draw(|frame| {
        ui::draw(
          frame,
          &mut self.view_stack,
          &self.posts,
          &self.command,
          self.hint.as_deref(),
        )
      })?;

      match events.next().await {
        Some(Event::Key(key)) => {
          self.handle_key(key);
          // Views react to page changes without waiting for the next tick
          self.tick();
        }
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    tracing::info!("Shutting down");
    Ok(())
  }

  fn tick(&mut self) {
    self.posts.poll();
    if let Some(view) = self.view_stack.last_mut() {
      view.tick(&mut self.posts);
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    self.hint = None;

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let captures_input = self
      .view_stack
      .last()
      .is_some_and(|view| view.captures_input());

    if self.command.is_active() || !captures_input {
      match self.command.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(event) => {
          self.handle_command(event);
          return;
        }
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    let action = view.handle_key(key, &mut self.posts);
    self.apply_action(action);
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn handle_command(&mut self, event: CommandEvent) {
    match event {
      CommandEvent::Run(action) => self.execute_command(action),
      CommandEvent::Unknown(name) if name.is_empty() => {}
      CommandEvent::Unknown(name) => {
        self.hint = Some(format!("Unknown command: {}", name));
      }
      CommandEvent::Cancelled => {}
    }
  }

  fn execute_command(&mut self, action: CommandAction) {
    tracing::debug!(?action, "Running command");
    match action {
      CommandAction::Posts => self.view_stack.truncate(1),
      CommandAction::NewPost => {
        self.view_stack.truncate(1);
        let form = PostFormView::new(&self.posts);
        self.view_stack.push(Box::new(form));
      }
      CommandAction::FirstPage => {
        self.posts.go_to_page(1);
      }
      CommandAction::LastPage => {
        let last = self.posts.total_pages();
        self.posts.go_to_page(last);
      }
      CommandAction::Refresh => self.posts.refresh_current_page(),
      CommandAction::Quit => self.should_quit = true,
    }
  }
}
