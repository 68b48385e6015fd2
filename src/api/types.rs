use serde::{Deserialize, Serialize};

/// A post as stored by the remote collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
  pub id: u64,
  pub title: String,
  pub body: String,
  pub user_id: u32,
}

impl Post {
  /// Writable fields of this post, used to seed an edit buffer
  pub fn fields(&self) -> PostFields {
    PostFields {
      title: self.title.clone(),
      body: self.body.clone(),
      user_id: self.user_id,
    }
  }
}

/// Request body for create and full-replace update.
///
/// Carries no identifier: the server assigns it on create and the URL
/// carries it on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
  pub title: String,
  pub body: String,
  pub user_id: u32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_post_uses_api_field_names() {
    let json = r#"{"userId": 3, "id": 21, "title": "hello", "body": "world"}"#;
    let post: Post = serde_json::from_str(json).unwrap();
    assert_eq!(post.id, 21);
    assert_eq!(post.user_id, 3);
  }

  #[test]
  fn test_fields_omit_id() {
    let fields = PostFields {
      title: "t".into(),
      body: "b".into(),
      user_id: 1,
    };
    let value = serde_json::to_value(&fields).unwrap();
    assert!(value.get("id").is_none());
    assert_eq!(value["userId"], 1);
  }
}
