use thiserror::Error;

/// Errors returned by the remote posts API.
///
/// Cloneable so a failed query can keep its error in the cache entry
/// while views render it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Non-success HTTP status, connection failure or undecodable body
  #[error("{}", transport_message(.status, .message))]
  Transport {
    status: Option<u16>,
    message: String,
  },
  /// Single-item fetch for an identifier the server does not know
  #[error("post {0} not found")]
  NotFound(u64),
}

impl ApiError {
  pub fn transport(message: impl Into<String>) -> Self {
    ApiError::Transport {
      status: None,
      message: message.into(),
    }
  }

  pub fn status(status: u16, message: impl Into<String>) -> Self {
    ApiError::Transport {
      status: Some(status),
      message: message.into(),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound(_))
  }
}

fn transport_message(status: &Option<u16>, message: &str) -> String {
  match status {
    Some(code) => format!("request failed with status {}: {}", code, message),
    None => format!("request failed: {}", message),
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    match err.status() {
      Some(status) => ApiError::status(status.as_u16(), err.to_string()),
      None => ApiError::transport(err.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_transport_display_with_status() {
    let err = ApiError::status(500, "Internal Server Error");
    assert_eq!(
      err.to_string(),
      "request failed with status 500: Internal Server Error"
    );
  }

  #[test]
  fn test_transport_display_without_status() {
    let err = ApiError::transport("connection refused");
    assert_eq!(err.to_string(), "request failed: connection refused");
  }

  #[test]
  fn test_not_found() {
    let err = ApiError::NotFound(42);
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "post 42 not found");
  }
}
