//! The signed-in user and the payloads that create or change one.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, token::Claims};

/// Display name used when the token carries no `name` claim.
pub const DEFAULT_NAME: &str = "User";

/// Role assumed when the token carries no role claim.
pub const DEFAULT_ROLE: &str = "User";

/// Identity of the signed-in user.
///
/// Serialised as the `currentUser` storage entry, so the JSON field names
/// match what the backend uses (`surName`, `mail`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:      i64,
  pub name:    String,
  #[serde(rename = "surName", default)]
  pub surname: String,
  #[serde(default)]
  pub mail:    String,
  #[serde(default = "default_role")]
  pub role:    String,
}

fn default_role() -> String { DEFAULT_ROLE.to_string() }

impl User {
  /// Derive the user from token claims. `login_mail` stands in for a missing
  /// `email` claim. A token without a numeric subject id is unusable.
  pub fn from_claims(claims: &Claims, login_mail: &str) -> Result<Self> {
    let id = claims.subject_id.ok_or(Error::MissingClaim("sub"))?;
    Ok(Self {
      id,
      name: claims.name.clone().unwrap_or_else(|| DEFAULT_NAME.to_string()),
      surname: claims.surname.clone().unwrap_or_default(),
      mail: claims
        .email
        .clone()
        .unwrap_or_else(|| login_mail.trim().to_string()),
      role: claims.role.clone().unwrap_or_else(default_role),
    })
  }

  /// `"Name Surname"`, without a trailing space when the surname is empty.
  pub fn full_name(&self) -> String {
    if self.surname.is_empty() {
      self.name.clone()
    } else {
      format!("{} {}", self.name, self.surname)
    }
  }
}

// ─── Request payloads ────────────────────────────────────────────────────────

/// Body of `POST /api/auth/Login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  #[serde(rename = "Mail")]
  pub mail:     String,
  #[serde(rename = "Password")]
  pub password: String,
}

impl Credentials {
  pub fn new(mail: &str, password: &str) -> Self {
    Self {
      mail:     mail.trim().to_string(),
      password: password.to_string(),
    }
  }
}

/// Body of `POST /api/user/Register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Registration {
  pub name:     String,
  #[serde(rename = "SurName")]
  pub surname:  String,
  pub mail:     String,
  pub password: String,
}

impl Registration {
  /// Trims every field except the password.
  pub fn new(name: &str, surname: &str, mail: &str, password: &str) -> Self {
    Self {
      name:     name.trim().to_string(),
      surname:  surname.trim().to_string(),
      mail:     mail.trim().to_string(),
      password: password.to_string(),
    }
  }
}

/// Query of `PUT /api/user/update`. An empty password leaves it unchanged on
/// the backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileUpdate {
  pub id:       i64,
  pub name:     String,
  #[serde(rename = "SurName")]
  pub surname:  String,
  pub mail:     String,
  pub password: String,
}

impl ProfileUpdate {
  /// The user as it should look once the backend accepted this update.
  /// Role is not editable, so it is carried over from `current`.
  pub fn apply_to(&self, current: &User) -> User {
    User {
      id:      current.id,
      name:    self.name.clone(),
      surname: self.surname.clone(),
      mail:    self.mail.clone(),
      role:    current.role.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn from_claims_applies_defaults() {
    let claims = Claims { subject_id: Some(5), ..Claims::default() };
    let user = User::from_claims(&claims, "  me@example.com ").unwrap();
    assert_eq!(user, User {
      id:      5,
      name:    "User".into(),
      surname: String::new(),
      mail:    "me@example.com".into(),
      role:    "User".into(),
    });
  }

  #[test]
  fn from_claims_requires_subject() {
    let claims = Claims { name: Some("Ali".into()), ..Claims::default() };
    assert!(matches!(
      User::from_claims(&claims, "a@b.c"),
      Err(Error::MissingClaim("sub"))
    ));
  }

  #[test]
  fn user_json_uses_backend_field_names() {
    let user = User {
      id:      3,
      name:    "Can".into(),
      surname: "Demir".into(),
      mail:    "can@example.com".into(),
      role:    "User".into(),
    };
    let value = serde_json::to_value(&user).unwrap();
    assert_eq!(value, json!({
      "id": 3, "name": "Can", "surName": "Demir",
      "mail": "can@example.com", "role": "User",
    }));
  }

  #[test]
  fn payloads_serialise_in_pascal_case() {
    let reg = Registration::new(" Can ", " Demir", "can@example.com ", " pw ");
    assert_eq!(serde_json::to_value(&reg).unwrap(), json!({
      "Name": "Can", "SurName": "Demir", "Mail": "can@example.com", "Password": " pw ",
    }));

    let creds = Credentials::new(" can@example.com ", "pw");
    assert_eq!(
      serde_json::to_value(&creds).unwrap(),
      json!({ "Mail": "can@example.com", "Password": "pw" })
    );
  }

  #[test]
  fn profile_update_keeps_role() {
    let current = User {
      id:      1,
      name:    "Old".into(),
      surname: "Name".into(),
      mail:    "old@example.com".into(),
      role:    "Admin".into(),
    };
    let update = ProfileUpdate {
      id:       1,
      name:     "New".into(),
      surname:  "Name".into(),
      mail:     "new@example.com".into(),
      password: String::new(),
    };
    let next = update.apply_to(&current);
    assert_eq!(next.name, "New");
    assert_eq!(next.mail, "new@example.com");
    assert_eq!(next.role, "Admin");
  }
}
