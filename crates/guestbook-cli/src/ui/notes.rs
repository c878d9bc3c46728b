//! Notes screen: the shared list on the left, the active form on the right.

use guestbook_core::{note::Note, storage::SessionStorage};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{List, ListItem, ListState, Paragraph, Wrap},
};

use super::{error_line, form_lines, pane};
use crate::app::{App, Mode};

pub fn draw<S: SessionStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
    .split(area);

  draw_list(f, cols[0], app);
  draw_side(f, cols[1], app);
}

// ─── List pane ────────────────────────────────────────────────────────────────

fn draw_list<S: SessionStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
  let filtered = app.filtered_notes();
  let total = app.notes.len();
  let filtering = app.mode == Mode::Filter || !app.filter.is_empty();

  let title = if filtering {
    format!("Notes ({}/{})", filtered.len(), total)
  } else {
    format!("Notes ({total})")
  };
  let block = pane(title, matches!(app.mode, Mode::Browse | Mode::Filter));
  let mut inner = block.inner(area);
  f.render_widget(block, area);

  // Error and filter lines take rows off the top and bottom of the pane.
  if !app.list_error.is_empty() && inner.height > 2 {
    let top = Rect { height: 1, ..inner };
    f.render_widget(Paragraph::new(error_line(&app.list_error)), top);
    inner.y += 1;
    inner.height -= 1;
  }
  if !app.delete_error.is_empty() && inner.height > 2 {
    let top = Rect { height: 1, ..inner };
    f.render_widget(Paragraph::new(error_line(&app.delete_error)), top);
    inner.y += 1;
    inner.height -= 1;
  }
  if filtering && inner.height > 2 {
    let bottom = Rect {
      y: inner.y + inner.height - 1,
      height: 1,
      ..inner
    };
    inner.height -= 1;
    let text = if app.mode == Mode::Filter {
      format!("neighborhood: {}_", app.filter)
    } else {
      format!("neighborhood: {}", app.filter)
    };
    f.render_widget(
      Paragraph::new(text).style(Style::default().fg(Color::Yellow)),
      bottom,
    );
  }

  if filtered.is_empty() {
    let message = if app.loading {
      "Loading…"
    } else if total == 0 {
      "No notes yet. Press n to write the first one."
    } else {
      "No notes match the filter."
    };
    f.render_widget(
      Paragraph::new(message).style(Style::default().fg(Color::DarkGray)),
      inner,
    );
    return;
  }

  let items: Vec<ListItem> = filtered.iter().map(|note| note_item(app, note)).collect();

  let mut state = ListState::default();
  state.select(Some(app.list_cursor));
  f.render_stateful_widget(
    List::new(items).highlight_style(
      Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD),
    ),
    inner,
    &mut state,
  );
}

/// Two lines per note: a metadata line, then the text.
fn note_item<'a, S: SessionStorage>(app: &App<S>, note: &'a Note) -> ListItem<'a> {
  let own = app.can_modify(note);
  let marker = if own { "★ " } else { "  " };
  let author = format!("{} {}", note.author_name, note.author_surname);
  let date = note
    .created_at
    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_default();

  let mut meta = vec![
    Span::styled(marker, Style::default().fg(Color::Yellow)),
    Span::styled(
      author.trim().to_string(),
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ),
    Span::styled(format!(" <{}>", note.author_mail), Style::default().fg(Color::Gray)),
    Span::styled(format!("  {date}"), Style::default().fg(Color::DarkGray)),
  ];
  if app.neighborhoods_enabled {
    meta.push(Span::styled(
      format!("  {}", app.neighborhood_label(note)),
      Style::default().fg(Color::Magenta),
    ));
  }

  ListItem::new(vec![
    Line::from(meta),
    Line::from(vec![Span::raw("  "), Span::raw(note.text.as_str())]),
  ])
}

// ─── Side pane ────────────────────────────────────────────────────────────────

fn draw_side<S: SessionStorage>(f: &mut Frame, area: Rect, app: &App<S>) {
  let (title, lines) = match app.mode {
    Mode::Edit => ("Edit note", form_lines(&app.edit_form, true)),
    Mode::Profile => ("Profile", form_lines(&app.profile_form, true)),
    Mode::ConfirmDelete => ("Delete note", confirm_lines(app)),
    Mode::Compose => ("New note", compose_lines(app, true)),
    Mode::Browse | Mode::Filter => ("New note", compose_lines(app, false)),
  };
  let focused = !matches!(app.mode, Mode::Browse | Mode::Filter);
  f.render_widget(
    Paragraph::new(lines)
      .block(pane(title, focused))
      .wrap(Wrap { trim: false }),
    area,
  );
}

fn compose_lines<S: SessionStorage>(app: &App<S>, active: bool) -> Vec<Line<'static>> {
  let mut lines = form_lines(&app.compose_form, active);
  if app.neighborhoods_enabled {
    let chosen = match app.selected_neighborhood() {
      Some(n) => match &n.district {
        Some(district) => format!("‹ {} ({district}) ›", n.name),
        None => format!("‹ {} ›", n.name),
      },
      None => "‹ choose a neighborhood ›".to_string(),
    };
    lines.insert(
      0,
      Line::from(vec![
        Span::styled("Neighborhood  ", Style::default().fg(Color::Gray)),
        Span::styled(chosen, Style::default().fg(Color::Magenta)),
      ]),
    );
  }
  if !active {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      "Press n to write a note.",
      Style::default().fg(Color::DarkGray),
    )));
  }
  lines
}

fn confirm_lines<S: SessionStorage>(app: &App<S>) -> Vec<Line<'static>> {
  let text = app
    .pending_delete
    .and_then(|id| app.notes.iter().find(|n| n.id == id))
    .map(|n| n.text.clone())
    .unwrap_or_default();
  vec![
    Line::from("Delete this note?"),
    Line::from(""),
    Line::from(Span::styled(text, Style::default().fg(Color::Gray))),
    Line::from(""),
    Line::from(Span::styled(
      "y to delete, any other key to keep it",
      Style::default().fg(Color::Yellow),
    )),
  ]
}
