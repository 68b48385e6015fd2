mod command_input;
mod input;

pub use command_input::{CommandEvent, CommandInput};
pub use input::{InputResult, TextInput};

/// How a component answered a key event.
///
/// Components report back to their parent view through this instead of
/// component-specific result enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}
