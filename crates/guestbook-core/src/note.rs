//! Guestbook notes.
//!
//! The backend has no "list notes" endpoint; notes arrive nested under their
//! authors from `GET /api/user/users` and are flattened here into a single
//! list in server order.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Domain type ─────────────────────────────────────────────────────────────

/// A guestbook entry together with its author's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
  pub id:              i64,
  pub text:            String,
  pub author_id:       i64,
  pub author_name:     String,
  pub author_surname:  String,
  pub author_mail:     String,
  pub created_at:      Option<DateTime<Utc>>,
  pub neighborhood_id: Option<i64>,
}

impl Note {
  /// Only the author may edit or delete a note.
  pub fn is_owned_by(&self, user_id: i64) -> bool { self.author_id == user_id }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One entry of `GET /api/user/users`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithNotes {
  #[serde(default)]
  pub name:     String,
  #[serde(default)]
  pub sur_name: String,
  #[serde(default)]
  pub mail:     String,
  /// Absent or `null` for users who never posted.
  #[serde(default)]
  pub notes:    Option<Vec<RawNote>>,
}

/// A note as nested under its author.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNote {
  pub id:         i64,
  #[serde(default)]
  pub text:       String,
  #[serde(default)]
  pub date_time:  Option<String>,
  pub user_id:    i64,
  #[serde(default)]
  pub mahalle_id: Option<i64>,
}

/// Flatten the per-user listing into notes, keeping server order.
pub fn flatten_users(users: Vec<UserWithNotes>) -> Vec<Note> {
  users
    .into_iter()
    .flat_map(|user| {
      let UserWithNotes { name, sur_name, mail, notes } = user;
      notes.unwrap_or_default().into_iter().map(move |raw| Note {
        id:              raw.id,
        text:            raw.text,
        author_id:       raw.user_id,
        author_name:     name.clone(),
        author_surname:  sur_name.clone(),
        author_mail:     mail.clone(),
        created_at:      raw.date_time.as_deref().and_then(parse_timestamp),
        neighborhood_id: raw.mahalle_id,
      })
    })
    .collect()
}

/// Parse an RFC 3339 timestamp, or a zone-less ISO one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
    .ok()
    .map(|naive| naive.and_utc())
}

// ─── Request payloads ────────────────────────────────────────────────────────

/// Body of `POST /api/Note/CreateNote`.
#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
  pub text:            String,
  #[serde(rename = "UserId")]
  pub user_id:         i64,
  #[serde(rename = "MahalleId", skip_serializing_if = "Option::is_none")]
  pub neighborhood_id: Option<i64>,
}

/// Body of `PUT /api/Note/UpdateNote`.
#[derive(Debug, Clone, Serialize)]
pub struct NoteUpdate {
  #[serde(rename = "Id")]
  pub id:      i64,
  #[serde(rename = "UserId")]
  pub user_id: i64,
  pub text:    String,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;

  #[test]
  fn flattens_users_in_order() {
    let users: Vec<UserWithNotes> = serde_json::from_value(json!([
      {
        "id": 1, "name": "Ayşe", "surName": "Kaya", "mail": "ayse@example.com",
        "notes": [
          { "id": 10, "text": "first", "dateTime": "2024-05-01T10:00:00", "userId": 1, "mahalleId": 3 },
          { "id": 11, "text": "second", "dateTime": null, "userId": 1 }
        ]
      },
      { "id": 2, "name": "Mehmet", "surName": "Ak", "mail": "m@example.com", "notes": null },
      { "id": 3, "name": "Zeynep", "surName": "Er", "mail": "z@example.com" },
      {
        "id": 4, "name": "Can", "surName": "Öz", "mail": "c@example.com",
        "notes": [{ "id": 7, "text": "third", "dateTime": "2024-05-02T08:30:00Z", "userId": 4 }]
      }
    ]))
    .unwrap();

    let notes = flatten_users(users);
    let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![10, 11, 7]);

    assert_eq!(notes[0].author_name, "Ayşe");
    assert_eq!(notes[0].author_surname, "Kaya");
    assert_eq!(notes[0].neighborhood_id, Some(3));
    assert_eq!(
      notes[0].created_at,
      Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(notes[1].created_at, None);
    assert_eq!(notes[2].author_id, 4);
    assert_eq!(notes[2].author_mail, "c@example.com");
  }

  #[test]
  fn timestamps_parse_leniently() {
    assert!(parse_timestamp("2024-05-01T10:00:00.1234567").is_some());
    assert!(parse_timestamp("2024-05-01T10:00:00+03:00").is_some());
    assert_eq!(parse_timestamp("yesterday"), None);
  }

  #[test]
  fn ownership_follows_author_id() {
    let note = Note {
      id:              1,
      text:            "hi".into(),
      author_id:       9,
      author_name:     String::new(),
      author_surname:  String::new(),
      author_mail:     String::new(),
      created_at:      None,
      neighborhood_id: None,
    };
    assert!(note.is_owned_by(9));
    assert!(!note.is_owned_by(8));
  }

  #[test]
  fn new_note_omits_missing_neighborhood() {
    let note = NewNote { text: "hello".into(), user_id: 2, neighborhood_id: None };
    assert_eq!(
      serde_json::to_value(&note).unwrap(),
      json!({ "text": "hello", "UserId": 2 })
    );
    let note = NewNote { neighborhood_id: Some(4), ..note };
    assert_eq!(
      serde_json::to_value(&note).unwrap(),
      json!({ "text": "hello", "UserId": 2, "MahalleId": 4 })
    );
  }
}
