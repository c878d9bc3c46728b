//! Async HTTP client wrapping the guestbook REST API.
//!
//! One method per backend operation. Every method classifies the response the
//! same way: 2xx yields data, 401 on an authorised call yields
//! [`ApiError::Unauthorized`], any other status yields [`ApiError::Server`]
//! with the most readable message the body offers.

pub mod error;

use std::time::Duration;

use guestbook_core::{
  neighborhood::Neighborhood,
  note::{NewNote, Note, NoteUpdate, UserWithNotes, flatten_users},
  token,
  user::{Credentials, ProfileUpdate, Registration},
};
use reqwest::{
  Client, RequestBuilder, Response, StatusCode,
  header::{ACCEPT, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{ApiError, Result, error_message};

const JSON: &str = "application/json";

/// Connection settings for the guestbook API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url:             String,
  pub timeout:              Duration,
  /// Accept self-signed certificates, as development backends use.
  pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url:             "https://localhost:7149".to_string(),
      timeout:              Duration::from_secs(30),
      accept_invalid_certs: false,
    }
  }
}

/// Async HTTP client for the guestbook REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .danger_accept_invalid_certs(config.accept_invalid_certs)
      .build()
      .map_err(ApiError::Build)?;
    Ok(Self { client, config })
  }

  pub fn base_url(&self) -> &str { &self.config.base_url }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn anonymous(&self, req: RequestBuilder) -> RequestBuilder { req.header(ACCEPT, JSON) }

  fn authorized(&self, req: RequestBuilder, token: &str) -> RequestBuilder {
    req
      .header(ACCEPT, JSON)
      .bearer_auth(token::clean_token(token))
  }

  // ── Auth & users ──────────────────────────────────────────────────────────

  /// `POST /api/auth/Login`, returning the raw bearer token.
  pub async fn login(&self, credentials: &Credentials) -> Result<String> {
    let path = "/api/auth/Login";
    let req = self
      .anonymous(self.client.post(self.url(path)))
      .json(credentials);
    let resp = check(send(req, "POST", path).await?).await?;

    let content_type = content_type(&resp);
    let body = resp.text().await?;
    token_from_body(content_type.as_deref(), &body)
  }

  /// `POST /api/user/Register`
  pub async fn register(&self, registration: &Registration) -> Result<()> {
    let path = "/api/user/Register";
    let req = self
      .anonymous(self.client.post(self.url(path)))
      .json(registration);
    check(send(req, "POST", path).await?).await?;
    Ok(())
  }

  /// `PUT /api/user/update?Id=..&Name=..&SurName=..&Mail=..&Password=..`
  pub async fn update_user(&self, token: &str, update: &ProfileUpdate) -> Result<()> {
    let path = "/api/user/update";
    let req = self
      .authorized(self.client.put(self.url(path)), token)
      .query(update);
    check_authorized(send(req, "PUT", path).await?).await?;
    Ok(())
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  /// `GET /api/user/users`, flattened into notes in server order.
  pub async fn list_notes(&self, token: &str) -> Result<Vec<Note>> {
    let path = "/api/user/users";
    let req = self.authorized(self.client.get(self.url(path)), token);
    let resp = check_authorized(send(req, "GET", path).await?).await?;
    let users: Vec<UserWithNotes> = read_json(resp).await?;
    Ok(flatten_users(users))
  }

  /// `POST /api/Note/CreateNote`
  pub async fn create_note(&self, token: &str, note: &NewNote) -> Result<()> {
    let path = "/api/Note/CreateNote";
    let req = self
      .authorized(self.client.post(self.url(path)), token)
      .json(note);
    check_authorized(send(req, "POST", path).await?).await?;
    Ok(())
  }

  /// `PUT /api/Note/UpdateNote`
  pub async fn update_note(&self, token: &str, update: &NoteUpdate) -> Result<()> {
    let path = "/api/Note/UpdateNote";
    let req = self
      .authorized(self.client.put(self.url(path)), token)
      .json(update);
    check_authorized(send(req, "PUT", path).await?).await?;
    Ok(())
  }

  /// `DELETE /api/Note/DeleteNote?id=<id>`
  pub async fn delete_note(&self, token: &str, note_id: i64) -> Result<()> {
    let path = "/api/Note/DeleteNote";
    let req = self
      .authorized(self.client.delete(self.url(path)), token)
      .query(&[("id", note_id)]);
    check_authorized(send(req, "DELETE", path).await?).await?;
    Ok(())
  }

  // ── Neighborhoods ─────────────────────────────────────────────────────────

  /// `GET /api/Mahalle/AllMahalles`
  pub async fn list_neighborhoods(&self, token: &str) -> Result<Vec<Neighborhood>> {
    let path = "/api/Mahalle/AllMahalles";
    let req = self.authorized(self.client.get(self.url(path)), token);
    let resp = check_authorized(send(req, "GET", path).await?).await?;
    read_json(resp).await
  }
}

// ─── Response handling ───────────────────────────────────────────────────────

async fn send(req: RequestBuilder, method: &str, path: &str) -> Result<Response> {
  match req.send().await {
    Ok(resp) => {
      tracing::debug!(method, path, status = resp.status().as_u16(), "request done");
      Ok(resp)
    }
    Err(e) => {
      tracing::warn!(method, path, error = %e, "request failed");
      Err(ApiError::Network(e))
    }
  }
}

/// Classify a response to an anonymous request: any non-2xx is a server
/// error, 401 included (a failed login is not an expired session).
async fn check(resp: Response) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let content_type = content_type(&resp);
  let body = resp.text().await.unwrap_or_default();
  Err(ApiError::Server {
    status:  status.as_u16(),
    message: error_message(status.as_u16(), content_type.as_deref(), &body),
  })
}

/// Like [`check`], but 401 means the bearer token is no longer accepted.
async fn check_authorized(resp: Response) -> Result<Response> {
  if resp.status() == StatusCode::UNAUTHORIZED {
    tracing::info!("server rejected the bearer token");
    return Err(ApiError::Unauthorized);
  }
  check(resp).await
}

fn content_type(resp: &Response) -> Option<String> {
  resp
    .headers()
    .get(CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned)
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
  let body = resp.text().await?;
  Ok(serde_json::from_str(&body)?)
}

/// Pull the token out of a login response: a JSON object with `token` or
/// `accessToken`, a JSON string, or plain text (quotes stripped).
fn token_from_body(content_type: Option<&str>, body: &str) -> Result<String> {
  let token = if content_type.is_some_and(|ct| ct.contains("json")) {
    match serde_json::from_str::<Value>(body)? {
      Value::String(s) => s,
      Value::Object(map) => ["token", "accessToken"]
        .iter()
        .find_map(|k| map.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_owned(),
      _ => String::new(),
    }
  } else {
    body.replace('"', "")
  };

  let token = token.trim();
  if token.is_empty() {
    return Err(ApiError::MissingToken);
  }
  Ok(token.to_owned())
}

#[cfg(test)]
mod tests;
