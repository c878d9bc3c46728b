//! Login and register screens.

use guestbook_core::storage::SessionStorage;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Style},
  text::{Line, Span},
  widgets::{Paragraph, Wrap},
};

use super::{centered, form_lines, pane};
use crate::app::{App, Screen};

/// Render the centred auth form into `area`.
pub fn draw<S: SessionStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
  let (title, form, footer) = match app.screen {
    Screen::Register => ("Create account", &app.register_form, "Already registered? Esc to log in."),
    _ => ("Log in", &app.login_form, "No account yet? Ctrl-R to register."),
  };

  let mut lines = form_lines(form, true);
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(footer, Style::default().fg(Color::DarkGray))));

  let height = lines.len() as u16 + 2;
  let rect = centered(area, 60, height);
  f.render_widget(
    Paragraph::new(lines)
      .block(pane(title, true))
      .wrap(Wrap { trim: false }),
    rect,
  );
}
