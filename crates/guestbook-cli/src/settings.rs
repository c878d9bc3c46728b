//! Layered configuration: defaults < TOML file < `GUESTBOOK_*` env < flags.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use guestbook_client::ApiConfig;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://localhost:7149";
const DEFAULT_STORE_PATH: &str = "~/.local/share/guestbook/session.db";
const DEFAULT_CONFIG_PATH: &str = "~/.config/guestbook/config.toml";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Default)]
#[command(name = "guestbook", version, about = "Terminal client for the guestbook")]
pub struct Args {
  /// Path to a TOML config file (default: ~/.config/guestbook/config.toml).
  #[arg(short, long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// Base URL of the guestbook API.
  #[arg(long)]
  pub url: Option<String>,

  /// SQLite file holding the saved session.
  #[arg(long, value_name = "FILE")]
  pub store: Option<PathBuf>,

  /// Log file (default: guestbook.log next to the session store).
  #[arg(long, value_name = "FILE")]
  pub log_file: Option<PathBuf>,

  /// Hide neighborhoods, for backends without the neighborhood endpoint.
  #[arg(long)]
  pub no_neighborhoods: bool,

  /// Accept self-signed TLS certificates (development backends only).
  #[arg(long)]
  pub insecure: bool,
}

// ─── Settings ─────────────────────────────────────────────────────────────────

/// Resolved configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub base_url:             String,
  pub store_path:           PathBuf,
  #[serde(default)]
  pub log_file:             Option<PathBuf>,
  pub neighborhoods:        bool,
  pub accept_invalid_certs: bool,
  pub timeout_secs:         u64,
}

impl Settings {
  pub fn load(args: &Args) -> Result<Self> {
    let mut builder = config::Config::builder()
      .set_default("base_url", DEFAULT_BASE_URL)?
      .set_default("store_path", DEFAULT_STORE_PATH)?
      .set_default("neighborhoods", true)?
      .set_default("accept_invalid_certs", false)?
      .set_default("timeout_secs", 30_i64)?;

    builder = match &args.config {
      Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
      None => builder.add_source(
        config::File::from(expand_tilde(Path::new(DEFAULT_CONFIG_PATH))).required(false),
      ),
    };

    builder = builder.add_source(config::Environment::with_prefix("GUESTBOOK").try_parsing(true));

    if let Some(url) = &args.url {
      builder = builder.set_override("base_url", url.as_str())?;
    }
    if let Some(store) = &args.store {
      builder = builder.set_override("store_path", store.to_string_lossy().as_ref())?;
    }
    if let Some(log_file) = &args.log_file {
      builder = builder.set_override("log_file", log_file.to_string_lossy().as_ref())?;
    }
    if args.no_neighborhoods {
      builder = builder.set_override("neighborhoods", false)?;
    }
    if args.insecure {
      builder = builder.set_override("accept_invalid_certs", true)?;
    }

    let mut settings: Settings = builder
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise Settings")?;

    settings.store_path = expand_tilde(&settings.store_path);
    settings.log_file = settings.log_file.as_deref().map(expand_tilde);
    Ok(settings)
  }

  /// Explicit log file, or `guestbook.log` beside the session store.
  pub fn log_path(&self) -> PathBuf {
    self
      .log_file
      .clone()
      .unwrap_or_else(|| self.store_path.with_file_name("guestbook.log"))
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      base_url:             self.base_url.clone(),
      timeout:              Duration::from_secs(self.timeout_secs),
      accept_invalid_certs: self.accept_invalid_certs,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_defaults() {
    let args = Args {
      config: Some(PathBuf::from("/nonexistent/guestbook.toml")),
      ..Args::default()
    };
    // An explicit config file must exist.
    assert!(Settings::load(&args).is_err());

    let dir = std::env::temp_dir().join(format!("guestbook-settings-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("config.toml");
    std::fs::write(&file, "base_url = \"https://file.example\"\ntimeout_secs = 5\n").unwrap();

    let args = Args {
      config: Some(file.clone()),
      store: Some(PathBuf::from("/tmp/gb/session.db")),
      no_neighborhoods: true,
      insecure: true,
      ..Args::default()
    };
    let settings = Settings::load(&args).unwrap();
    assert_eq!(settings.base_url, "https://file.example");
    assert_eq!(settings.timeout_secs, 5);
    assert_eq!(settings.store_path, PathBuf::from("/tmp/gb/session.db"));
    assert_eq!(settings.log_path(), PathBuf::from("/tmp/gb/guestbook.log"));
    assert!(!settings.neighborhoods);
    assert!(settings.accept_invalid_certs);

    let args = Args {
      config: Some(file),
      url: Some("http://flag.example".into()),
      ..Args::default()
    };
    let settings = Settings::load(&args).unwrap();
    assert_eq!(settings.base_url, "http://flag.example");
    assert!(settings.neighborhoods);
    assert_eq!(settings.api_config().timeout, Duration::from_secs(5));

    std::fs::remove_dir_all(dir).ok();
  }

  #[test]
  fn tilde_expands_to_home() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/x/y")), PathBuf::from(home).join("x/y"));
    }
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
