//! API error type and response-body message extraction.

use serde_json::Value;
use thiserror::Error;

/// An error returned by an [`crate::ApiClient`] call.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("failed to build HTTP client: {0}")]
  Build(#[source] reqwest::Error),

  /// The backend rejected the bearer token; the caller must drop the session.
  #[error("unauthorized, please log in again")]
  Unauthorized,

  /// Any other non-2xx response, with the most readable message found.
  #[error("{message}")]
  Server { status: u16, message: String },

  #[error("could not reach the server: {0}")]
  Network(#[from] reqwest::Error),

  #[error("unexpected response from the server: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("the server did not return a token")]
  MissingToken,
}

impl ApiError {
  pub fn is_unauthorized(&self) -> bool { matches!(self, Self::Unauthorized) }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Human-readable message for a failed response.
///
/// JSON bodies yield the first non-empty `detail`, `title` or `message`
/// field; other bodies yield their trimmed text. Falls back to
/// `HTTP <status>`.
pub fn error_message(status: u16, content_type: Option<&str>, body: &str) -> String {
  let body = body.trim();
  let fallback = || format!("HTTP {status}");
  if body.is_empty() {
    return fallback();
  }

  if content_type.is_some_and(|ct| ct.contains("json")) {
    match serde_json::from_str::<Value>(body) {
      Ok(Value::Object(map)) => {
        return ["detail", "title", "message"]
          .iter()
          .find_map(|k| {
            map
              .get(*k)
              .and_then(Value::as_str)
              .map(str::trim)
              .filter(|s| !s.is_empty())
          })
          .map(str::to_owned)
          .unwrap_or_else(fallback);
      }
      Ok(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_owned(),
      _ => {}
    }
  }

  body.to_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  const JSON: Option<&str> = Some("application/problem+json; charset=utf-8");

  #[test]
  fn prefers_detail_then_title_then_message() {
    let body = r#"{"title":"Bad Request","detail":"Mail already taken","message":"x"}"#;
    assert_eq!(error_message(400, JSON, body), "Mail already taken");

    let body = r#"{"title":"Bad Request","message":"x"}"#;
    assert_eq!(error_message(400, JSON, body), "Bad Request");

    let body = r#"{"message":"Note not found"}"#;
    assert_eq!(error_message(404, JSON, body), "Note not found");
  }

  #[test]
  fn json_without_known_fields_falls_back_to_status() {
    assert_eq!(error_message(422, JSON, r#"{"errors":{}}"#), "HTTP 422");
    assert_eq!(error_message(422, JSON, r#"{"detail":"  "}"#), "HTTP 422");
    assert_eq!(error_message(422, JSON, r#"{"detail":"","title":"Invalid"}"#), "Invalid");
  }

  #[test]
  fn plain_text_is_used_verbatim() {
    assert_eq!(error_message(500, Some("text/plain"), "  boom \n"), "boom");
    assert_eq!(error_message(500, None, "boom"), "boom");
  }

  #[test]
  fn empty_body_falls_back_to_status() {
    assert_eq!(error_message(503, Some("text/plain"), ""), "HTTP 503");
    assert_eq!(error_message(503, JSON, "   "), "HTTP 503");
  }

  #[test]
  fn mislabelled_json_is_treated_as_text() {
    assert_eq!(error_message(400, JSON, "not json"), "not json");
    assert_eq!(error_message(400, JSON, r#""quoted message""#), "quoted message");
  }
}
