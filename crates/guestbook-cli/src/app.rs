//! Application state machine and event dispatcher.
//!
//! Key handling is synchronous and never touches the network: it edits local
//! state and, when a request is needed, returns a [`Command`]. The event loop
//! redraws (showing the loading state) and then awaits [`App::run`].

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use guestbook_client::{ApiClient, ApiError};
use guestbook_core::{
  neighborhood::{self, Neighborhood},
  note::{NewNote, Note, NoteUpdate},
  session::{Restored, Session, SessionManager},
  storage::SessionStorage,
  user::{Credentials, ProfileUpdate, Registration, User},
};

use crate::form::{Form, FormInput};

pub const SESSION_EXPIRED: &str = "Your session has expired, please log in again.";
pub const UNAUTHORIZED: &str = "Unauthorized! Your session has expired, please log in again.";

// Field indices.
const LOGIN_MAIL: usize = 0;
const LOGIN_PASSWORD: usize = 1;
const REG_NAME: usize = 0;
const REG_SURNAME: usize = 1;
const REG_MAIL: usize = 2;
const REG_PASSWORD: usize = 3;
const PROFILE_NAME: usize = 0;
const PROFILE_SURNAME: usize = 1;
const PROFILE_MAIL: usize = 2;
const PROFILE_PASSWORD: usize = 3;

// ─── Screen / mode ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  Login,
  Register,
  Notes,
}

/// Keyboard focus within [`Screen::Notes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  /// Navigating the note list.
  Browse,
  /// Typing a new note.
  Compose,
  /// Typing the neighborhood filter.
  Filter,
  /// Editing one of the user's own notes.
  Edit,
  /// Waiting for y/n before deleting.
  ConfirmDelete,
  /// Editing the user's profile.
  Profile,
}

/// A request the event loop should run after redrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Login,
  Register,
  LoadNotes,
  CreateNote,
  UpdateNote,
  DeleteNote,
  UpdateProfile,
  Logout,
}

/// Result of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  Continue,
  Quit,
  Run(Command),
}

/// Where an API error is displayed.
#[derive(Debug, Clone, Copy)]
enum Slot {
  Login,
  Register,
  Compose,
  Edit,
  Profile,
  List,
  Delete,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App<S> {
  pub screen: Screen,
  pub mode:   Mode,

  pub login_form:    Form,
  pub register_form: Form,
  pub compose_form:  Form,
  pub edit_form:     Form,
  pub profile_form:  Form,

  /// Signed-in user; `None` on the auth screens.
  pub user:    Option<User>,
  session:     Option<Session>,

  /// Notes as last returned by the server, in server order.
  pub notes:         Vec<Note>,
  pub neighborhoods: Vec<Neighborhood>,
  /// Whether the backend has neighborhoods at all.
  pub neighborhoods_enabled: bool,
  /// Index into `neighborhoods` for the compose form.
  pub selected_neighborhood: Option<usize>,

  /// Neighborhood substring filter.
  pub filter: String,
  /// Cursor position within the *filtered* note list.
  pub list_cursor: usize,

  /// Note being edited.
  pub editing:        Option<i64>,
  /// Note awaiting delete confirmation.
  pub pending_delete: Option<i64>,

  /// A request is in flight.
  pub loading:      bool,
  pub list_error:   String,
  pub delete_error: String,
  /// One-line status message shown in the status bar.
  pub status_msg:   String,

  sessions:   SessionManager<S>,
  pub client: ApiClient,
}

impl<S: SessionStorage> App<S> {
  pub fn new(client: ApiClient, sessions: SessionManager<S>, neighborhoods_enabled: bool) -> Self {
    Self {
      screen: Screen::Login,
      mode: Mode::Browse,
      login_form: Form::new(&[("E-mail", false), ("Password", true)]),
      register_form: Form::new(&[
        ("Name", false),
        ("Surname", false),
        ("E-mail", false),
        ("Password", true),
      ]),
      compose_form: Form::new(&[("Note", false)]),
      edit_form: Form::new(&[("Note", false)]),
      profile_form: Form::new(&[
        ("Name", false),
        ("Surname", false),
        ("E-mail", false),
        ("New password (optional)", true),
      ]),
      user: None,
      session: None,
      notes: Vec::new(),
      neighborhoods: Vec::new(),
      neighborhoods_enabled,
      selected_neighborhood: None,
      filter: String::new(),
      list_cursor: 0,
      editing: None,
      pending_delete: None,
      loading: false,
      list_error: String::new(),
      delete_error: String::new(),
      status_msg: String::new(),
      sessions,
      client,
    }
  }

  // ── Derived views ─────────────────────────────────────────────────────────

  /// Notes that pass the neighborhood filter.
  pub fn filtered_notes(&self) -> Vec<&Note> {
    if !self.neighborhoods_enabled {
      return self.notes.iter().collect();
    }
    neighborhood::filter_notes(&self.notes, &self.neighborhoods, &self.filter)
  }

  /// The note under the list cursor in the filtered view, if any.
  pub fn cursor_note(&self) -> Option<&Note> {
    self.filtered_notes().get(self.list_cursor).copied()
  }

  /// Edit and delete are offered only on the user's own notes.
  pub fn can_modify(&self, note: &Note) -> bool {
    self.user.as_ref().is_some_and(|u| note.is_owned_by(u.id))
  }

  pub fn neighborhood_label(&self, note: &Note) -> &str {
    neighborhood::label_for(&self.neighborhoods, note)
  }

  pub fn selected_neighborhood(&self) -> Option<&Neighborhood> {
    self.selected_neighborhood.and_then(|i| self.neighborhoods.get(i))
  }

  fn clamp_cursor(&mut self) {
    let len = self.filtered_notes().len();
    self.list_cursor = self.list_cursor.min(len.saturating_sub(1));
  }

  fn slot(&mut self, slot: Slot) -> &mut String {
    match slot {
      Slot::Login => &mut self.login_form.error,
      Slot::Register => &mut self.register_form.error,
      Slot::Compose => &mut self.compose_form.error,
      Slot::Edit => &mut self.edit_form.error,
      Slot::Profile => &mut self.profile_form.error,
      Slot::List => &mut self.list_error,
      Slot::Delete => &mut self.delete_error,
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event.
  pub fn handle_key(&mut self, key: KeyEvent) -> Flow {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Flow::Quit;
    }

    match self.screen {
      Screen::Login => self.handle_login_key(key),
      Screen::Register => self.handle_register_key(key),
      Screen::Notes => match self.mode {
        Mode::Browse => self.handle_browse_key(key),
        Mode::Compose => self.handle_compose_key(key),
        Mode::Filter => self.handle_filter_key(key),
        Mode::Edit => self.handle_edit_key(key),
        Mode::ConfirmDelete => self.handle_confirm_key(key),
        Mode::Profile => self.handle_profile_key(key),
      },
    }
  }

  fn is_switch(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('r')
  }

  fn handle_login_key(&mut self, key: KeyEvent) -> Flow {
    if Self::is_switch(&key) {
      self.screen = Screen::Register;
      self.login_form.error.clear();
      self.register_form.error.clear();
      return Flow::Continue;
    }
    match self.login_form.handle_key(key) {
      FormInput::Submit => Flow::Run(Command::Login),
      FormInput::Cancel => Flow::Quit,
      FormInput::Edited | FormInput::Ignored => Flow::Continue,
    }
  }

  fn handle_register_key(&mut self, key: KeyEvent) -> Flow {
    if Self::is_switch(&key) {
      self.show_login();
      return Flow::Continue;
    }
    match self.register_form.handle_key(key) {
      FormInput::Submit => Flow::Run(Command::Register),
      FormInput::Cancel => {
        self.show_login();
        Flow::Continue
      }
      FormInput::Edited | FormInput::Ignored => Flow::Continue,
    }
  }

  fn show_login(&mut self) {
    self.screen = Screen::Login;
    self.login_form.error.clear();
    self.register_form.error.clear();
  }

  fn handle_browse_key(&mut self, key: KeyEvent) -> Flow {
    self.status_msg.clear();
    match key.code {
      KeyCode::Char('q') => return Flow::Quit,

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.filtered_notes().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }
      KeyCode::Home | KeyCode::Char('g') => self.list_cursor = 0,
      KeyCode::End | KeyCode::Char('G') => {
        self.list_cursor = self.filtered_notes().len().saturating_sub(1);
      }

      // Actions
      KeyCode::Char('n') | KeyCode::Char('i') => {
        self.mode = Mode::Compose;
        self.compose_form.error.clear();
      }
      KeyCode::Char('/') if self.neighborhoods_enabled => {
        self.mode = Mode::Filter;
        self.filter.clear();
        self.list_cursor = 0;
      }
      KeyCode::Char('e') => self.begin_edit(),
      KeyCode::Char('d') => self.begin_delete(),
      KeyCode::Char('p') => self.begin_profile(),
      KeyCode::Char('r') => return Flow::Run(Command::LoadNotes),
      KeyCode::Char('x') => return Flow::Run(Command::Logout),

      _ => {}
    }
    Flow::Continue
  }

  fn handle_compose_key(&mut self, key: KeyEvent) -> Flow {
    match key.code {
      KeyCode::Left => {
        self.cycle_neighborhood(-1);
        return Flow::Continue;
      }
      KeyCode::Right => {
        self.cycle_neighborhood(1);
        return Flow::Continue;
      }
      _ => {}
    }
    match self.compose_form.handle_key(key) {
      FormInput::Submit => Flow::Run(Command::CreateNote),
      FormInput::Cancel => {
        self.mode = Mode::Browse;
        Flow::Continue
      }
      FormInput::Edited | FormInput::Ignored => Flow::Continue,
    }
  }

  fn cycle_neighborhood(&mut self, step: isize) {
    let len = self.neighborhoods.len();
    if !self.neighborhoods_enabled || len == 0 {
      return;
    }
    let next = match self.selected_neighborhood {
      None => 0,
      Some(i) => (i as isize + step).rem_euclid(len as isize) as usize,
    };
    self.selected_neighborhood = Some(next);
    self.compose_form.error.clear();
  }

  fn handle_filter_key(&mut self, key: KeyEvent) -> Flow {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Browse;
        self.filter.clear();
        self.list_cursor = 0;
      }
      KeyCode::Enter => {
        self.mode = Mode::Browse;
        self.list_cursor = 0;
      }
      KeyCode::Backspace => {
        self.filter.pop();
        self.list_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.list_cursor = 0;
      }
      _ => {}
    }
    Flow::Continue
  }

  fn handle_edit_key(&mut self, key: KeyEvent) -> Flow {
    match self.edit_form.handle_key(key) {
      FormInput::Submit => Flow::Run(Command::UpdateNote),
      FormInput::Cancel => {
        self.editing = None;
        self.edit_form.clear();
        self.mode = Mode::Browse;
        Flow::Continue
      }
      FormInput::Edited | FormInput::Ignored => Flow::Continue,
    }
  }

  fn handle_confirm_key(&mut self, key: KeyEvent) -> Flow {
    if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
      return Flow::Run(Command::DeleteNote);
    }
    self.pending_delete = None;
    self.mode = Mode::Browse;
    self.status_msg = "Delete cancelled.".into();
    Flow::Continue
  }

  fn handle_profile_key(&mut self, key: KeyEvent) -> Flow {
    match self.profile_form.handle_key(key) {
      FormInput::Submit => Flow::Run(Command::UpdateProfile),
      FormInput::Cancel => {
        self.mode = Mode::Browse;
        Flow::Continue
      }
      FormInput::Edited | FormInput::Ignored => Flow::Continue,
    }
  }

  fn begin_edit(&mut self) {
    let Some(note) = self.cursor_note() else { return };
    let (id, text, owned) = (note.id, note.text.clone(), self.can_modify(note));
    if !owned {
      self.status_msg = "You can only edit your own notes.".into();
      return;
    }
    self.editing = Some(id);
    self.edit_form.clear();
    self.edit_form.set(0, text);
    self.mode = Mode::Edit;
  }

  fn begin_delete(&mut self) {
    let Some(note) = self.cursor_note() else { return };
    let (id, owned) = (note.id, self.can_modify(note));
    if !owned {
      self.status_msg = "You can only delete your own notes.".into();
      return;
    }
    self.pending_delete = Some(id);
    self.delete_error.clear();
    self.mode = Mode::ConfirmDelete;
  }

  fn begin_profile(&mut self) {
    let Some(user) = self.user.clone() else { return };
    self.profile_form.clear();
    self.profile_form.set(PROFILE_NAME, user.name);
    self.profile_form.set(PROFILE_SURNAME, user.surname);
    self.profile_form.set(PROFILE_MAIL, user.mail);
    self.mode = Mode::Profile;
  }

  // ── Commands ──────────────────────────────────────────────────────────────

  pub async fn run(&mut self, command: Command) {
    tracing::debug!(?command, "running command");
    match command {
      Command::Login => self.submit_login().await,
      Command::Register => self.submit_register().await,
      Command::LoadNotes => self.load_notes().await,
      Command::CreateNote => self.submit_note().await,
      Command::UpdateNote => self.submit_edit().await,
      Command::DeleteNote => self.confirm_delete().await,
      Command::UpdateProfile => self.submit_profile().await,
      Command::Logout => {
        self.logout().await;
        if self.status_msg.is_empty() {
          self.status_msg = "Logged out.".into();
        }
      }
    }
  }

  /// Start-up: resume a stored session if it is still valid.
  pub async fn restore_session(&mut self) -> anyhow::Result<()> {
    match self.sessions.restore(Utc::now()).await? {
      Restored::Active(session) => {
        tracing::info!(user_id = session.user.id, "resumed stored session");
        self.enter(session).await;
      }
      Restored::Expired => self.login_form.error = SESSION_EXPIRED.into(),
      Restored::Absent => {}
    }
    Ok(())
  }

  async fn enter(&mut self, session: Session) {
    self.user = Some(session.user.clone());
    self.session = Some(session);
    self.screen = Screen::Notes;
    self.mode = Mode::Browse;
    if self.neighborhoods_enabled {
      self.load_neighborhoods().await;
    }
    // A rejected token while loading neighborhoods has already logged out.
    if self.session.is_some() {
      self.load_notes().await;
    }
  }

  /// Token of the current session, or `None` after forcing a logout because
  /// the session is missing or has entered the expiry buffer.
  async fn active_token(&mut self) -> Option<String> {
    let token = self
      .session
      .as_ref()
      .filter(|s| s.is_valid_at(Utc::now()))
      .map(|s| s.token.clone());
    if token.is_none() {
      tracing::info!("session expired, logging out");
      self.logout().await;
      self.login_form.error = SESSION_EXPIRED.into();
    }
    token
  }

  /// Surface `err` in `slot`, or log out when the token was rejected.
  async fn fail(&mut self, slot: Slot, err: ApiError, context: Option<&str>) {
    if err.is_unauthorized() {
      self.logout().await;
      self.login_form.error = UNAUTHORIZED.into();
      return;
    }
    tracing::warn!(error = %err, ?slot, "request failed");
    *self.slot(slot) = match context {
      Some(context) => format!("{context}: {err}"),
      None => err.to_string(),
    };
  }

  pub async fn submit_login(&mut self) {
    let mail = self.login_form.value(LOGIN_MAIL).trim().to_owned();
    let password = self.login_form.value(LOGIN_PASSWORD).to_owned();
    if mail.is_empty() || password.is_empty() {
      self.login_form.error = "E-mail and password are required.".into();
      return;
    }
    self.login_form.error.clear();

    let token = match self.client.login(&Credentials::new(&mail, &password)).await {
      Ok(token) => token,
      Err(e) => return self.fail(Slot::Login, e, None).await,
    };
    let session = match Session::from_token(&token, &mail) {
      Ok(session) => session,
      Err(e) => {
        tracing::warn!(error = %e, "login returned an unusable token");
        self.login_form.error = format!("Could not read the token: {e}");
        return;
      }
    };
    if let Err(e) = self.sessions.persist(&session).await {
      tracing::error!(error = %e, "failed to persist session");
      self.login_form.error = format!("Could not save the session: {e}");
      return;
    }

    tracing::info!(user_id = session.user.id, "logged in");
    self.login_form.clear();
    self.enter(session).await;
  }

  pub async fn submit_register(&mut self) {
    if !self.register_form.blank_fields().is_empty() {
      self.register_form.error = "All fields are required.".into();
      return;
    }
    let registration = Registration::new(
      self.register_form.value(REG_NAME),
      self.register_form.value(REG_SURNAME),
      self.register_form.value(REG_MAIL),
      self.register_form.value(REG_PASSWORD),
    );
    match self.client.register(&registration).await {
      Ok(()) => {
        tracing::info!("registered new account");
        self.register_form.clear();
        self.show_login();
        self.login_form.set(LOGIN_MAIL, registration.mail);
        self.status_msg = "Registration successful! You can now log in.".into();
      }
      Err(e) => self.fail(Slot::Register, e, None).await,
    }
  }

  pub async fn load_notes(&mut self) {
    let Some(token) = self.active_token().await else { return };
    self.list_error.clear();
    match self.client.list_notes(&token).await {
      Ok(notes) => {
        tracing::debug!(count = notes.len(), "notes loaded");
        self.notes = notes;
        self.clamp_cursor();
      }
      Err(e) => self.fail(Slot::List, e, Some("Could not load notes")).await,
    }
  }

  pub async fn load_neighborhoods(&mut self) {
    let Some(token) = self.active_token().await else { return };
    match self.client.list_neighborhoods(&token).await {
      Ok(list) => {
        self.neighborhoods = list;
        if self.selected_neighborhood.is_none_or(|i| i >= self.neighborhoods.len()) {
          self.selected_neighborhood = (!self.neighborhoods.is_empty()).then_some(0);
        }
      }
      Err(e) if e.is_unauthorized() => self.fail(Slot::List, e, None).await,
      Err(e) => {
        tracing::warn!(error = %e, "could not load neighborhoods");
        self.status_msg = format!("Could not load neighborhoods: {e}");
      }
    }
  }

  pub async fn submit_note(&mut self) {
    let text = self.compose_form.value(0).trim().to_owned();
    if text.is_empty() {
      self.compose_form.error = "Note text cannot be empty.".into();
      return;
    }
    let neighborhood_id = if self.neighborhoods_enabled {
      match self.selected_neighborhood() {
        Some(n) => Some(n.id),
        None => {
          self.compose_form.error = "Please choose a neighborhood.".into();
          return;
        }
      }
    } else {
      None
    };
    let Some(user_id) = self.user.as_ref().map(|u| u.id) else {
      self.compose_form.error = "User information not found.".into();
      return;
    };
    let Some(token) = self.active_token().await else { return };

    let note = NewNote { text, user_id, neighborhood_id };
    match self.client.create_note(&token, &note).await {
      Ok(()) => {
        self.compose_form.clear();
        self.mode = Mode::Browse;
        self.status_msg = "Note added.".into();
        self.load_notes().await;
      }
      Err(e) => self.fail(Slot::Compose, e, None).await,
    }
  }

  pub async fn submit_edit(&mut self) {
    let text = self.edit_form.value(0).trim().to_owned();
    if text.is_empty() {
      self.edit_form.error = "Note text cannot be empty.".into();
      return;
    }
    let Some(note) = self
      .editing
      .and_then(|id| self.notes.iter().find(|n| n.id == id))
    else {
      self.edit_form.error = "Note not found.".into();
      return;
    };
    let (id, owned) = (note.id, self.can_modify(note));
    if !owned {
      self.edit_form.error = "You can only edit your own notes.".into();
      return;
    }
    let Some(user_id) = self.user.as_ref().map(|u| u.id) else { return };
    let Some(token) = self.active_token().await else { return };

    let update = NoteUpdate { id, user_id, text };
    match self.client.update_note(&token, &update).await {
      Ok(()) => {
        self.editing = None;
        self.edit_form.clear();
        self.mode = Mode::Browse;
        self.status_msg = "Note updated.".into();
        self.load_notes().await;
      }
      Err(e) => self.fail(Slot::Edit, e, None).await,
    }
  }

  pub async fn confirm_delete(&mut self) {
    self.mode = Mode::Browse;
    let Some(id) = self.pending_delete.take() else { return };
    let owned = self
      .notes
      .iter()
      .find(|n| n.id == id)
      .is_some_and(|n| self.can_modify(n));
    if !owned {
      self.delete_error = "You can only delete your own notes.".into();
      return;
    }
    let Some(token) = self.active_token().await else { return };

    self.delete_error.clear();
    match self.client.delete_note(&token, id).await {
      Ok(()) => {
        self.status_msg = "Note deleted.".into();
        self.load_notes().await;
      }
      Err(e) => self.fail(Slot::Delete, e, None).await,
    }
  }

  pub async fn submit_profile(&mut self) {
    let Some(current) = self.user.clone() else { return };
    let blank = self.profile_form.blank_fields();
    if blank.contains(&PROFILE_NAME) || blank.contains(&PROFILE_MAIL) {
      self.profile_form.error = "Name and e-mail are required.".into();
      return;
    }
    let Some(token) = self.active_token().await else { return };

    let update = ProfileUpdate {
      id:       current.id,
      name:     self.profile_form.value(PROFILE_NAME).trim().to_owned(),
      surname:  self.profile_form.value(PROFILE_SURNAME).trim().to_owned(),
      mail:     self.profile_form.value(PROFILE_MAIL).trim().to_owned(),
      password: self.profile_form.value(PROFILE_PASSWORD).to_owned(),
    };
    match self.client.update_user(&token, &update).await {
      Ok(()) => {
        let user = update.apply_to(&current);
        self.status_msg = match self.sessions.update_user(&user).await {
          Ok(()) => "Profile updated.".into(),
          Err(e) => {
            tracing::error!(error = %e, "failed to persist updated user");
            format!("Profile updated, but it could not be saved locally: {e}")
          }
        };
        if let Some(session) = &mut self.session {
          session.user = user.clone();
        }
        self.user = Some(user);
        self.profile_form.clear();
        self.mode = Mode::Browse;
      }
      Err(e) => self.fail(Slot::Profile, e, None).await,
    }
  }

  /// Drop the session and every piece of state derived from it.
  pub async fn logout(&mut self) {
    let cleared = self.sessions.clear().await;
    if let Some(user) = &self.user {
      tracing::info!(user_id = user.id, "logged out");
    }
    self.user = None;
    self.session = None;
    self.notes.clear();
    self.neighborhoods.clear();
    self.selected_neighborhood = None;
    self.filter.clear();
    self.list_cursor = 0;
    self.editing = None;
    self.pending_delete = None;
    self.login_form.clear();
    self.register_form.clear();
    self.compose_form.clear();
    self.edit_form.clear();
    self.profile_form.clear();
    self.list_error.clear();
    self.delete_error.clear();
    self.status_msg.clear();
    self.screen = Screen::Login;
    self.mode = Mode::Browse;
    if let Err(e) = cleared {
      tracing::error!(error = %e, "failed to clear stored session");
      self.status_msg = format!("Could not clear the saved session: {e}");
    }
  }
}
