/// Available commands and autocomplete logic

/// What a command does once submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  /// Show the post list (root view)
  Posts,
  /// Open the create form
  NewPost,
  /// Jump to the first page
  FirstPage,
  /// Jump to the last page
  LastPage,
  /// Refetch the current page
  Refresh,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "posts",
    aliases: &["p", "list"],
    description: "Browse posts",
    action: CommandAction::Posts,
  },
  Command {
    name: "new",
    aliases: &["n", "create"],
    description: "Write a new post",
    action: CommandAction::NewPost,
  },
  Command {
    name: "first",
    aliases: &["home"],
    description: "Go to the first page",
    action: CommandAction::FirstPage,
  },
  Command {
    name: "last",
    aliases: &["end"],
    description: "Go to the last page",
    action: CommandAction::LastPage,
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch the current page",
    action: CommandAction::Refresh,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit postboard",
    action: CommandAction::Quit,
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // Sort by priority, stable for equal priorities
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; `None` means no match
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn resolve(input: &str) -> Option<&'static Command> {
    get_suggestions(input).into_iter().next()
  }

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("posts");
    assert_eq!(suggestions[0].action, CommandAction::Posts);
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(resolve("n").unwrap().action, CommandAction::NewPost);
    assert_eq!(resolve("q").unwrap().action, CommandAction::Quit);
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(resolve("ref").unwrap().action, CommandAction::Refresh);
  }

  #[test]
  fn test_substring_match() {
    assert_eq!(resolve("ost").unwrap().action, CommandAction::Posts);
  }

  #[test]
  fn test_no_match() {
    assert!(resolve("zzz").is_none());
  }
}
