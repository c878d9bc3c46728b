//! Bearer token decoding and expiry checks.
//!
//! Tokens are JWT-shaped (`header.payload.signature`). Only the payload is
//! read; the signature is never verified here because the backend re-checks
//! every request it receives.

use base64::{
  Engine as _, alphabet,
  engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Seconds before the real expiry at which a token already counts as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// ASP.NET identity URI carrying the numeric user id.
pub const NAME_IDENTIFIER_CLAIM: &str =
  "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

/// ASP.NET identity URI carrying the user's role.
pub const ROLE_CLAIM: &str =
  "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// base64url, padding optional on decode.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
  &alphabet::URL_SAFE,
  GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ─── Claims ──────────────────────────────────────────────────────────────────

/// The payload fields this client cares about. Every field is optional at
/// this level; [`crate::user::User::from_claims`] decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
  pub subject_id: Option<i64>,
  pub name:       Option<String>,
  pub surname:    Option<String>,
  pub email:      Option<String>,
  pub role:       Option<String>,
  pub expires_at: Option<DateTime<Utc>>,
}

impl Claims {
  fn from_map(map: &Map<String, Value>) -> Self {
    Self {
      subject_id: ["sub", NAME_IDENTIFIER_CLAIM]
        .iter()
        .find_map(|k| map.get(*k).and_then(claim_i64)),
      name:       map.get("name").and_then(claim_string),
      surname:    map.get("surName").and_then(claim_string),
      email:      map.get("email").and_then(claim_string),
      role:       [ROLE_CLAIM, "role"]
        .iter()
        .find_map(|k| map.get(*k).and_then(claim_string)),
      expires_at: map
        .get("exp")
        .and_then(claim_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    }
  }

  /// `true` while `exp` lies more than [`EXPIRY_BUFFER_SECS`] after `now`.
  /// A token without `exp` is never valid.
  pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
    self
      .expires_at
      .is_some_and(|exp| exp > now + TimeDelta::seconds(EXPIRY_BUFFER_SECS))
  }
}

fn claim_i64(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n.as_i64().or_else(|| {
      n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.is_finite())
        .map(|f| f as i64)
    }),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn claim_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
    _ => None,
  }
}

// ─── Decoding ────────────────────────────────────────────────────────────────

/// Strip surrounding whitespace and one pair of wrapping double quotes, which
/// some backends leave around a plain-text token response.
pub fn clean_token(raw: &str) -> &str {
  let trimmed = raw.trim();
  trimmed
    .strip_prefix('"')
    .and_then(|s| s.strip_suffix('"'))
    .map(str::trim)
    .unwrap_or(trimmed)
}

/// Decode the payload of `token` without verifying its signature.
pub fn decode_token(token: &str) -> Result<Claims> {
  let mut segments = clean_token(token).split('.');
  let (Some(_), Some(payload), Some(_), None) = (
    segments.next(),
    segments.next(),
    segments.next(),
    segments.next(),
  ) else {
    return Err(Error::MalformedToken("expected three dot-separated segments"));
  };

  let bytes = URL_SAFE_LENIENT
    .decode(payload)
    .map_err(|_| Error::MalformedToken("payload is not base64url"))?;
  let value: Value = serde_json::from_slice(&bytes)
    .map_err(|_| Error::MalformedToken("payload is not JSON"))?;

  match value {
    Value::Object(map) => Ok(Claims::from_map(&map)),
    _ => Err(Error::MalformedToken("payload is not a JSON object")),
  }
}

/// Whether `token` decodes and has not entered the expiry buffer at `now`.
pub fn is_valid(token: &str, now: DateTime<Utc>) -> bool {
  decode_token(token).is_ok_and(|claims| claims.is_valid_at(now))
}

/// Build an unsigned token whose payload is `payload`. Handy for fixtures and
/// stand-in backends; real tokens always come from the server.
pub fn unsigned(payload: &Value) -> String {
  let header = URL_SAFE_LENIENT.encode(br#"{"alg":"none","typ":"JWT"}"#);
  let body = URL_SAFE_LENIENT.encode(payload.to_string());
  format!("{header}.{body}.")
}
