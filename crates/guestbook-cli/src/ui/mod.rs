//! Frame rendering: header, the active screen, status bar.

pub mod auth;
pub mod notes;

use chrono::Local;
use guestbook_core::storage::SessionStorage;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::{
  app::{App, Mode, Screen},
  form::Form,
};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw<S: SessionStorage>(f: &mut Frame, app: &App<S>) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  match app.screen {
    Screen::Login | Screen::Register => auth::draw(f, rows[1], app),
    Screen::Notes => notes::draw(f, rows[1], app),
  }
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header<S: SessionStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
  let who = match &app.user {
    Some(user) => format!("{} <{}>", user.full_name(), user.mail),
    None => app.client.base_url().to_string(),
  };

  let left = Span::styled(
    " guestbook",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{who}  {} ", Local::now().format("%Y-%m-%d")),
    Style::default().fg(Color::Gray),
  );

  let left_width = left.content.chars().count() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::DarkGray)),
    area,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status<S: SessionStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
  let (mode_label, hints) = match (app.screen, app.mode) {
    (Screen::Login, _) => ("LOGIN", "Tab next field  Enter log in  ^R register  Esc quit"),
    (Screen::Register, _) => ("REGISTER", "Tab next field  Enter register  Esc back"),
    (Screen::Notes, Mode::Browse) if app.neighborhoods_enabled => (
      "NOTES",
      "↑↓/jk move  n new  e edit  d delete  / filter  p profile  r refresh  x logout  q quit",
    ),
    (Screen::Notes, Mode::Browse) => (
      "NOTES",
      "↑↓/jk move  n new  e edit  d delete  p profile  r refresh  x logout  q quit",
    ),
    (Screen::Notes, Mode::Compose) if app.neighborhoods_enabled => {
      ("NEW", "Enter save  ←→ neighborhood  Esc cancel")
    }
    (Screen::Notes, Mode::Compose) => ("NEW", "Enter save  Esc cancel"),
    (Screen::Notes, Mode::Filter) => ("FILTER", "Type a neighborhood  Enter keep  Esc clear"),
    (Screen::Notes, Mode::Edit) => ("EDIT", "Enter save  Esc cancel"),
    (Screen::Notes, Mode::ConfirmDelete) => ("DELETE", "y confirm  any other key cancels"),
    (Screen::Notes, Mode::Profile) => ("PROFILE", "Tab next field  Enter save  Esc cancel"),
  };

  let status = if app.loading {
    "Loading…".to_string()
  } else if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let line = Line::from(vec![
    Span::styled(
      format!(" {mode_label} "),
      Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    ),
    Span::styled(format!("  {status}"), Style::default().fg(Color::Gray)),
  ]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// Lines for a form: one `label: value` row per field, the focused one marked
/// with a cursor, secrets masked, then the error (if any).
pub fn form_lines(form: &Form, active: bool) -> Vec<Line<'static>> {
  let mut lines: Vec<Line> = Vec::new();
  let width = form
    .fields
    .iter()
    .map(|f| f.label.chars().count())
    .max()
    .unwrap_or(0);

  for (i, field) in form.fields.iter().enumerate() {
    let focused = active && i == form.focus;
    let shown = if field.secret {
      "•".repeat(field.value.chars().count())
    } else {
      field.value.clone()
    };
    let label_style = if focused {
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::Gray)
    };
    lines.push(Line::from(vec![
      Span::styled(format!("{:<width$}  ", field.label), label_style),
      Span::raw(shown),
      Span::styled(if focused { "_" } else { "" }, Style::default().fg(Color::Yellow)),
    ]));
  }

  if !form.error.is_empty() {
    lines.push(Line::from(""));
    lines.push(error_line(&form.error));
  }
  lines
}

pub fn error_line(message: &str) -> Line<'static> {
  Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red)))
}

/// A `width` x `height` rectangle centred in `area`, clamped to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + (area.height - height) / 2,
    width,
    height,
  }
}

/// Bordered block used by every pane.
pub fn pane(title: impl Into<String>, focused: bool) -> Block<'static> {
  let border = if focused { Color::Cyan } else { Color::DarkGray };
  Block::bordered()
    .title(format!(" {} ", title.into()))
    .border_style(Style::default().fg(border))
}
