//! `guestbook`: terminal client for the shared guestbook.
//!
//! # Usage
//!
//! ```
//! guestbook --url https://localhost:7149 --insecure
//! guestbook --config ~/.config/guestbook/config.toml
//! ```

mod app;
mod form;
mod settings;
mod ui;

use std::{
  fs::{self, File},
  io,
  path::Path,
  sync::Mutex,
  time::Duration,
};

use anyhow::{Context, Result};
use app::{App, Flow};
use clap::Parser;
use crossterm::{
  event::{self, Event, KeyEventKind},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use guestbook_client::ApiClient;
use guestbook_core::{session::SessionManager, storage::SessionStorage};
use guestbook_store_sqlite::SqliteStorage;
use ratatui::{Terminal, backend::CrosstermBackend};
use settings::{Args, Settings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let settings = Settings::load(&args)?;

  // The terminal belongs to the UI, so logs go to a file.
  init_tracing(&settings.log_path())?;
  tracing::info!(
    base_url = %settings.base_url,
    store = %settings.store_path.display(),
    neighborhoods = settings.neighborhoods,
    "starting"
  );

  let storage = SqliteStorage::open(&settings.store_path)
    .await
    .with_context(|| format!("opening session store {}", settings.store_path.display()))?;
  let client = ApiClient::new(settings.api_config()).context("building HTTP client")?;
  let mut app = App::new(client, SessionManager::new(storage), settings.neighborhoods);

  // Set up the terminal.
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // Resume a stored session, then run the event loop; restore the terminal
  // even on error.
  let run_result = match app.restore_session().await {
    Ok(()) => run_event_loop(&mut terminal, &mut app).await,
    Err(e) => Err(e),
  };

  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  if let Err(e) = &run_result {
    tracing::error!(error = %e, "exiting with error");
  }
  run_result
}

fn init_tracing(path: &Path) -> Result<()> {
  if let Some(dir) = path.parent() {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
  }
  let file = File::options()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("opening log file {}", path.display()))?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(Mutex::new(file))
    .with_ansi(false)
    .init();
  Ok(())
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop<S: SessionStorage>(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App<S>,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    let Some(Event::Key(key)) = maybe_event else {
      // Resize and friends: the next iteration redraws.
      continue;
    };
    if key.kind != KeyEventKind::Press {
      continue;
    }

    match app.handle_key(key) {
      Flow::Continue => {}
      Flow::Quit => break,
      Flow::Run(command) => {
        // Show the loading state before blocking on the request.
        app.loading = true;
        terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;
        app.run(command).await;
        app.loading = false;
      }
    }
  }

  Ok(())
}
