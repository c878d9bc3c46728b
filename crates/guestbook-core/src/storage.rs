//! The `SessionStorage` trait: durable client-side key/value storage.
//!
//! Implemented by storage backends (e.g. `guestbook-store-sqlite`). The
//! session layer only ever touches the keys [`TOKEN_KEY`] and
//! [`CURRENT_USER_KEY`].

use std::{
  collections::HashMap,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
};

/// Key holding the raw bearer token.
pub const TOKEN_KEY: &str = "token";

/// Key holding the JSON-serialised [`crate::user::User`].
pub const CURRENT_USER_KEY: &str = "currentUser";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A string-keyed, string-valued durable store.
///
/// Access is read-then-write without atomicity guarantees; the client is a
/// single user in a single process.
pub trait SessionStorage: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Value stored under `key`, or `None`.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Removing a missing key is not an error.
  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── In-memory implementation ────────────────────────────────────────────────

/// Volatile storage; everything is lost when the process exits.
///
/// Cloning shares the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
  entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
  pub fn new() -> Self { Self::default() }

  /// Snapshot of the stored keys, sorted.
  pub fn keys(&self) -> Vec<String> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    let mut keys: Vec<String> = entries.keys().cloned().collect();
    keys.sort();
    keys
  }
}

impl SessionStorage for MemoryStorage {
  type Error = std::convert::Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
    let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Self::Error> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.remove(key);
    Ok(())
  }
}
