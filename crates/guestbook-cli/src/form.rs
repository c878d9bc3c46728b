//! Single-line text forms driven by key events.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// One labelled input.
#[derive(Debug, Clone)]
pub struct Field {
  pub label:  &'static str,
  pub value:  String,
  /// Rendered masked (passwords).
  pub secret: bool,
}

/// What a key did to a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormInput {
  /// Enter: the caller should validate and submit.
  Submit,
  /// Esc.
  Cancel,
  /// A value or the focus changed.
  Edited,
  /// The form has no use for the key; the caller may handle it.
  Ignored,
}

/// A vertical stack of fields with one focused field and an inline error.
#[derive(Debug, Clone)]
pub struct Form {
  pub fields: Vec<Field>,
  pub focus:  usize,
  pub error:  String,
}

impl Form {
  /// Build a form from `(label, secret)` pairs.
  pub fn new(specs: &[(&'static str, bool)]) -> Self {
    Self {
      fields: specs
        .iter()
        .map(|&(label, secret)| Field { label, value: String::new(), secret })
        .collect(),
      focus:  0,
      error:  String::new(),
    }
  }

  pub fn value(&self, index: usize) -> &str {
    self.fields.get(index).map(|f| f.value.as_str()).unwrap_or_default()
  }

  pub fn set(&mut self, index: usize, value: impl Into<String>) {
    if let Some(field) = self.fields.get_mut(index) {
      field.value = value.into();
    }
  }

  /// Empty every value and the error, focus the first field.
  pub fn clear(&mut self) {
    for field in &mut self.fields {
      field.value.clear();
    }
    self.focus = 0;
    self.error.clear();
  }

  /// Indices of fields whose trimmed value is empty.
  pub fn blank_fields(&self) -> Vec<usize> {
    self
      .fields
      .iter()
      .enumerate()
      .filter(|(_, f)| f.value.trim().is_empty())
      .map(|(i, _)| i)
      .collect()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> FormInput {
    let len = self.fields.len().max(1);
    match key.code {
      KeyCode::Enter => FormInput::Submit,
      KeyCode::Esc => FormInput::Cancel,
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % len;
        FormInput::Edited
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + len - 1) % len;
        FormInput::Edited
      }
      KeyCode::Backspace => {
        if let Some(field) = self.fields.get_mut(self.focus) {
          field.value.pop();
        }
        self.error.clear();
        FormInput::Edited
      }
      KeyCode::Char(c)
        if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
      {
        if let Some(field) = self.fields.get_mut(self.focus) {
          field.value.push(c);
        }
        self.error.clear();
        FormInput::Edited
      }
      _ => FormInput::Ignored,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn press(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  fn type_str(form: &mut Form, s: &str) {
    for c in s.chars() {
      form.handle_key(press(KeyCode::Char(c)));
    }
  }

  #[test]
  fn typing_goes_to_focused_field() {
    let mut form = Form::new(&[("Mail", false), ("Password", true)]);
    type_str(&mut form, "a@b.c");
    assert_eq!(form.handle_key(press(KeyCode::Tab)), FormInput::Edited);
    type_str(&mut form, "pw");
    form.handle_key(press(KeyCode::Backspace));

    assert_eq!(form.value(0), "a@b.c");
    assert_eq!(form.value(1), "p");
    assert!(form.fields[1].secret);
  }

  #[test]
  fn focus_wraps_both_ways() {
    let mut form = Form::new(&[("A", false), ("B", false), ("C", false)]);
    form.handle_key(press(KeyCode::Up));
    assert_eq!(form.focus, 2);
    form.handle_key(press(KeyCode::Down));
    assert_eq!(form.focus, 0);
  }

  #[test]
  fn editing_clears_the_error() {
    let mut form = Form::new(&[("Text", false)]);
    form.error = "Note text cannot be empty.".into();
    type_str(&mut form, "x");
    assert!(form.error.is_empty());
  }

  #[test]
  fn control_chords_and_arrows_are_ignored() {
    let mut form = Form::new(&[("Text", false)]);
    let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
    assert_eq!(form.handle_key(ctrl_r), FormInput::Ignored);
    assert_eq!(form.handle_key(press(KeyCode::Left)), FormInput::Ignored);
    assert_eq!(form.value(0), "");
  }

  #[test]
  fn blank_fields_and_clear() {
    let mut form = Form::new(&[("A", false), ("B", false)]);
    form.set(0, "  ");
    form.set(1, "x");
    assert_eq!(form.blank_fields(), vec![0]);
    form.focus = 1;
    form.error = "e".into();
    form.clear();
    assert_eq!(form.blank_fields(), vec![0, 1]);
    assert_eq!(form.focus, 0);
    assert!(form.error.is_empty());
  }
}
