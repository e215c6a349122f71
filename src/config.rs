use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheDurations;
use crate::tvdb::auth::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://api4.thetvdb.com/v4";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub tvdb: TvdbConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TvdbConfig {
  pub base_url: String,
  /// Project API key (overridden by TVDBC_API_KEY / TVDB_API_KEY)
  pub api_key: Option<String>,
  /// Subscriber PIN for user-supported keys (overridden by TVDBC_SUBSCRIBER_PIN)
  pub subscriber_pin: Option<String>,
  /// Contact appended to the User-Agent (e.g., an email or URL)
  pub contact: Option<String>,
  /// Per-request timeout enforced by the HTTP client
  pub timeout_secs: u64,
}

impl Default for TvdbConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_BASE_URL.to_string(),
      api_key: None,
      subscriber_pin: None,
      contact: None,
      timeout_secs: 30,
    }
  }
}

impl fmt::Debug for TvdbConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TvdbConfig")
      .field("base_url", &self.base_url)
      .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
      .field("subscriber_pin", &self.subscriber_pin.as_ref().map(|_| "<redacted>"))
      .field("contact", &self.contact)
      .field("timeout_secs", &self.timeout_secs)
      .finish()
  }
}

impl TvdbConfig {
  /// Login credentials; fails when no API key is configured.
  pub fn credentials(&self) -> Result<Credentials> {
    let api_key = self
      .api_key
      .clone()
      .filter(|k| !k.trim().is_empty())
      .ok_or_else(|| {
        eyre!("TVDB API key not found. Set TVDBC_API_KEY or tvdb.api_key in the config file.")
      })?;

    Ok(Credentials {
      api_key,
      pin: self.subscriber_pin.clone().filter(|p| !p.trim().is_empty()),
    })
  }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Lifetime of per-entity lookups, in hours (minimum 1)
  pub short_duration_hours: u64,
  /// Lifetime of reference data such as languages, in days (minimum 1)
  pub long_duration_days: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      short_duration_hours: 1,
      long_duration_days: 7,
    }
  }
}

impl CacheConfig {
  pub fn durations(&self) -> CacheDurations {
    CacheDurations {
      short: Duration::from_secs(self.short_duration_hours.max(1) * 60 * 60),
      long: Duration::from_secs(self.long_duration_days.max(1) * 24 * 60 * 60),
    }
  }
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./tvdbc.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tvdbc/config.yaml
  ///
  /// Defaults are used when no file exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => {
        tracing::debug!(path = %p.display(), "loading config");
        Self::load_from_path(&p)?
      }
      None => Config::default(),
    };

    Ok(config.with_overrides(Self::get_api_key(), Self::get_subscriber_pin()))
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("tvdbc.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tvdbc").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Replace file values with the given secrets when present.
  pub fn with_overrides(mut self, api_key: Option<String>, pin: Option<String>) -> Self {
    if api_key.is_some() {
      self.tvdb.api_key = api_key;
    }
    if pin.is_some() {
      self.tvdb.subscriber_pin = pin;
    }
    self
  }

  /// Get the TVDB API key from environment variables.
  ///
  /// Checks TVDBC_API_KEY first, then TVDB_API_KEY as fallback.
  pub fn get_api_key() -> Option<String> {
    std::env::var("TVDBC_API_KEY")
      .or_else(|_| std::env::var("TVDB_API_KEY"))
      .ok()
  }

  /// Get the subscriber PIN from TVDBC_SUBSCRIBER_PIN.
  pub fn get_subscriber_pin() -> Option<String> {
    std::env::var("TVDBC_SUBSCRIBER_PIN").ok()
  }
}
