//! Draft post form state and its validation rules.

use crate::api::PostFields;
use crate::persist::Slice;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const TITLE_MIN_LEN: usize = 3;
pub const BODY_MIN_LEN: usize = 10;
pub const USER_ID_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Unsaved post data as typed into a form.
///
/// Fields are kept as raw text so partially typed input survives a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
  pub title: String,
  pub body: String,
  pub user_id: String,
}

impl Slice for Draft {
  const KEY: &'static str = "postboard.draft";
  const VERSION: u32 = 1;
}

impl Draft {
  pub fn from_fields(fields: &PostFields) -> Self {
    Self {
      title: fields.title.clone(),
      body: fields.body.clone(),
      user_id: fields.user_id.to_string(),
    }
  }

  pub fn field(&self, field: Field) -> &str {
    match field {
      Field::Title => &self.title,
      Field::Body => &self.body,
      Field::UserId => &self.user_id,
    }
  }

  pub fn field_mut(&mut self, field: Field) -> &mut String {
    match field {
      Field::Title => &mut self.title,
      Field::Body => &mut self.body,
      Field::UserId => &mut self.user_id,
    }
  }

  /// Validate and convert into a request body
  pub fn to_fields(&self) -> Result<PostFields, ValidationErrors> {
    let errors = validate(self);
    if !errors.is_empty() {
      return Err(errors);
    }

    Ok(PostFields {
      title: self.title.trim().to_string(),
      body: self.body.trim().to_string(),
      user_id: parse_user_id(&self.user_id).unwrap_or_default(),
    })
  }
}

/// Form fields, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
  Title,
  Body,
  UserId,
}

impl Field {
  pub const ALL: [Field; 3] = [Field::Title, Field::Body, Field::UserId];

  pub fn label(self) -> &'static str {
    match self {
      Field::Title => "Title",
      Field::Body => "Body",
      Field::UserId => "User ID",
    }
  }

  pub fn next(self) -> Field {
    match self {
      Field::Title => Field::Body,
      Field::Body => Field::UserId,
      Field::UserId => Field::Title,
    }
  }

  pub fn prev(self) -> Field {
    match self {
      Field::Title => Field::UserId,
      Field::Body => Field::Title,
      Field::UserId => Field::Body,
    }
  }
}

/// Why a single field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
  TooShort { min: usize },
  NotANumber,
  OutOfRange { min: u32, max: u32 },
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldError::TooShort { min } => write!(f, "must be at least {} characters", min),
      FieldError::NotANumber => write!(f, "must be a whole number"),
      FieldError::OutOfRange { min, max } => write!(f, "must be between {} and {}", min, max),
    }
  }
}

/// Field-level validation failures. Never sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summary(.0))]
pub struct ValidationErrors(BTreeMap<Field, FieldError>);

impl ValidationErrors {
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn get(&self, field: Field) -> Option<&FieldError> {
    self.0.get(&field)
  }

  /// Inline message for a field, e.g. "Title must be at least 3 characters"
  pub fn message(&self, field: Field) -> Option<String> {
    self
      .get(field)
      .map(|err| format!("{} {}", field.label(), err))
  }

  pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldError)> {
    self.0.iter().map(|(field, err)| (*field, err))
  }
}

fn summary(errors: &BTreeMap<Field, FieldError>) -> String {
  errors
    .iter()
    .map(|(field, err)| format!("{} {}", field.label(), err))
    .collect::<Vec<_>>()
    .join("; ")
}

/// Check a draft against the form rules.
///
/// Title and body are measured after trimming; the user id must be an
/// integer within [`USER_ID_RANGE`].
pub fn validate(draft: &Draft) -> ValidationErrors {
  let mut errors = BTreeMap::new();

  if draft.title.trim().chars().count() < TITLE_MIN_LEN {
    errors.insert(Field::Title, FieldError::TooShort { min: TITLE_MIN_LEN });
  }

  if draft.body.trim().chars().count() < BODY_MIN_LEN {
    errors.insert(Field::Body, FieldError::TooShort { min: BODY_MIN_LEN });
  }

  if let Err(err) = parse_user_id(&draft.user_id) {
    errors.insert(Field::UserId, err);
  }

  ValidationErrors(errors)
}

/// Any integer literal, however large or negative, is a number; only then
/// is the range checked.
fn parse_user_id(raw: &str) -> Result<u32, FieldError> {
  let raw = raw.trim();
  let digits = raw
    .strip_prefix('-')
    .or_else(|| raw.strip_prefix('+'))
    .unwrap_or(raw);
  if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
    return Err(FieldError::NotANumber);
  }

  raw
    .parse::<i64>()
    .ok()
    .and_then(|id| u32::try_from(id).ok())
    .filter(|id| USER_ID_RANGE.contains(id))
    .ok_or(FieldError::OutOfRange {
      min: *USER_ID_RANGE.start(),
      max: *USER_ID_RANGE.end(),
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draft(title: &str, body: &str, user_id: &str) -> Draft {
    Draft {
      title: title.into(),
      body: body.into(),
      user_id: user_id.into(),
    }
  }

  #[test]
  fn test_valid_draft() {
    let errors = validate(&draft("abc", "0123456789", "1"));
    assert!(errors.is_empty());

    let errors = validate(&draft("  Hello world ", "  long enough body  ", " 10 "));
    assert!(errors.is_empty());
  }

  #[test]
  fn test_lengths_are_measured_after_trimming() {
    let errors = validate(&draft("  ab  ", "   123456789   ", "5"));
    assert_eq!(errors.get(Field::Title), Some(&FieldError::TooShort { min: 3 }));
    assert_eq!(errors.get(Field::Body), Some(&FieldError::TooShort { min: 10 }));
    assert_eq!(errors.get(Field::UserId), None);
  }

  #[test]
  fn test_user_id_bounds() {
    for bad in ["0", "11", "-1"] {
      let errors = validate(&draft("title", "a long enough body", bad));
      assert!(errors.get(Field::UserId).is_some(), "{} accepted", bad);
    }
    for good in ["1", "5", "10"] {
      let errors = validate(&draft("title", "a long enough body", good));
      assert!(errors.is_empty(), "{} rejected", good);
    }
  }

  #[test]
  fn test_huge_or_negative_user_id_is_out_of_range() {
    let out_of_range = FieldError::OutOfRange { min: 1, max: 10 };
    for raw in ["99999999999", "99999999999999999999999", "-1", "+11"] {
      let errors = validate(&draft("title", "a long enough body", raw));
      assert_eq!(errors.get(Field::UserId), Some(&out_of_range), "{}", raw);
    }
    assert_eq!(
      validate(&draft("title", "a long enough body", "-")).get(Field::UserId),
      Some(&FieldError::NotANumber)
    );
  }

  #[test]
  fn test_user_id_must_be_integer() {
    let errors = validate(&draft("title", "a long enough body", "2.5"));
    assert_eq!(errors.get(Field::UserId), Some(&FieldError::NotANumber));

    let errors = validate(&draft("title", "a long enough body", ""));
    assert_eq!(errors.get(Field::UserId), Some(&FieldError::NotANumber));
  }

  #[test]
  fn test_empty_draft_reports_every_field() {
    let errors = validate(&Draft::default());
    assert_eq!(errors.len(), 3);
    assert_eq!(
      errors.message(Field::Title).as_deref(),
      Some("Title must be at least 3 characters")
    );
  }

  #[test]
  fn test_to_fields_trims() {
    let fields = draft(" Title ", " Body text here ", " 3 ").to_fields().unwrap();
    assert_eq!(fields.title, "Title");
    assert_eq!(fields.body, "Body text here");
    assert_eq!(fields.user_id, 3);
  }

  #[test]
  fn test_field_cycle() {
    assert_eq!(Field::Title.next(), Field::Body);
    assert_eq!(Field::UserId.next(), Field::Title);
    assert_eq!(Field::Title.prev(), Field::UserId);
  }
}
