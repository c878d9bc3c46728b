//! Neighborhoods: the read-only reference list notes can be tagged with.

use serde::{Deserialize, Serialize};

use crate::note::Note;

/// Label shown for a note whose neighborhood id is unknown.
pub const UNKNOWN_NEIGHBORHOOD: &str = "Unknown neighborhood";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighborhood {
  pub id:       i64,
  pub name:     String,
  #[serde(default, alias = "ilce")]
  pub district: Option<String>,
}

/// Name of the neighborhood with `id`, if it is in `list`.
pub fn name_of(list: &[Neighborhood], id: Option<i64>) -> Option<&str> {
  let id = id?;
  list.iter().find(|n| n.id == id).map(|n| n.name.as_str())
}

/// Display label for a note's neighborhood.
pub fn label_for<'a>(list: &'a [Neighborhood], note: &Note) -> &'a str {
  name_of(list, note.neighborhood_id).unwrap_or(UNKNOWN_NEIGHBORHOOD)
}

/// Notes whose neighborhood name contains `filter`, case-insensitively.
///
/// An empty filter keeps every note; any other filter, whitespace included,
/// is matched as typed. Notes without a resolvable neighborhood never match a
/// non-empty filter, not even against the "Unknown neighborhood" label.
pub fn filter_notes<'a>(
  notes: &'a [Note],
  list: &[Neighborhood],
  filter: &str,
) -> Vec<&'a Note> {
  if filter.is_empty() {
    return notes.iter().collect();
  }
  let needle = filter.to_lowercase();
  notes
    .iter()
    .filter(|note| {
      name_of(list, note.neighborhood_id)
        .is_some_and(|name| name.to_lowercase().contains(&needle))
    })
    .collect()
}
