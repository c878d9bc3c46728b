//! Session lifecycle: create from a token, persist, restore, clear.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  storage::{CURRENT_USER_KEY, SessionStorage, TOKEN_KEY},
  token::{self, Claims},
  user::User,
};

// ─── Session ─────────────────────────────────────────────────────────────────

/// A signed-in session, derived entirely from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub token:  String,
  pub claims: Claims,
  pub user:   User,
}

impl Session {
  /// Decode `raw_token` and derive the user from its claims.
  ///
  /// `login_mail` is the address the user typed, used when the token has no
  /// `email` claim.
  pub fn from_token(raw_token: &str, login_mail: &str) -> Result<Self> {
    let token = token::clean_token(raw_token).to_string();
    let claims = token::decode_token(&token)?;
    let user = User::from_claims(&claims, login_mail)?;
    Ok(Self { token, claims, user })
  }

  pub fn expires_at(&self) -> Option<DateTime<Utc>> { self.claims.expires_at }

  /// See [`Claims::is_valid_at`].
  pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool { self.claims.is_valid_at(now) }
}

/// Outcome of [`SessionManager::restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
  /// Nothing was stored.
  Absent,
  /// A stored session that is still valid.
  Active(Session),
  /// A stored session that was expired or unreadable; it has been cleared.
  Expired,
}

// ─── Manager ─────────────────────────────────────────────────────────────────

/// Reads and writes the session through a [`SessionStorage`] backend.
#[derive(Debug, Clone)]
pub struct SessionManager<S> {
  storage: S,
}

impl<S: SessionStorage> SessionManager<S> {
  pub fn new(storage: S) -> Self { Self { storage } }

  pub fn storage(&self) -> &S { &self.storage }

  /// Write the token and the current user.
  pub async fn persist(&self, session: &Session) -> Result<()> {
    let user_json = serde_json::to_string(&session.user)?;
    self
      .storage
      .set(TOKEN_KEY, &session.token)
      .await
      .map_err(Error::storage)?;
    self
      .storage
      .set(CURRENT_USER_KEY, &user_json)
      .await
      .map_err(Error::storage)?;
    Ok(())
  }

  /// Replace the stored user after a profile edit; the token is untouched.
  pub async fn update_user(&self, user: &User) -> Result<()> {
    let user_json = serde_json::to_string(user)?;
    self
      .storage
      .set(CURRENT_USER_KEY, &user_json)
      .await
      .map_err(Error::storage)
  }

  /// Read the stored session without checking expiry.
  ///
  /// Returns `Ok(None)` unless both keys are present. A token or user entry
  /// that cannot be decoded is an error.
  pub async fn load(&self) -> Result<Option<Session>> {
    let token = self.storage.get(TOKEN_KEY).await.map_err(Error::storage)?;
    let user_json = self
      .storage
      .get(CURRENT_USER_KEY)
      .await
      .map_err(Error::storage)?;

    let (Some(token), Some(user_json)) = (token, user_json) else {
      return Ok(None);
    };

    let token = token::clean_token(&token).to_string();
    let claims = token::decode_token(&token)?;
    let user: User = serde_json::from_str(&user_json)?;
    Ok(Some(Session { token, claims, user }))
  }

  /// Remove every session key.
  pub async fn clear(&self) -> Result<()> {
    self.storage.remove(TOKEN_KEY).await.map_err(Error::storage)?;
    self
      .storage
      .remove(CURRENT_USER_KEY)
      .await
      .map_err(Error::storage)?;
    Ok(())
  }

  /// Start-up check: load the stored session and keep it only while valid.
  ///
  /// Expired, near-expiry and malformed sessions are cleared. Storage
  /// failures propagate.
  pub async fn restore(&self, now: DateTime<Utc>) -> Result<Restored> {
    match self.load().await {
      Ok(None) => Ok(Restored::Absent),
      Ok(Some(session)) if session.is_valid_at(now) => Ok(Restored::Active(session)),
      Ok(Some(session)) => {
        tracing::info!(
          expires_at = ?session.expires_at(),
          "stored session expired, clearing"
        );
        self.clear().await?;
        Ok(Restored::Expired)
      }
      Err(e @ Error::Storage(_)) => Err(e),
      Err(e) => {
        tracing::warn!(error = %e, "stored session unreadable, clearing");
        self.clear().await?;
        Ok(Restored::Expired)
      }
    }
  }
}
