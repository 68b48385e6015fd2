use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub pagination: PaginationConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base url of the posts API (the collection lives at `{url}/posts`)
  #[serde(default = "default_api_url")]
  pub url: String,
  /// Request timeout handed to the HTTP transport
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
  #[serde(default = "default_page_size")]
  pub page_size: u32,
  /// Assumed size of the remote collection; the page count derives from it
  #[serde(default = "default_total_items")]
  pub total_items: u32,
}

impl Default for PaginationConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
      total_items: default_total_items(),
    }
  }
}

impl PaginationConfig {
  /// Number of pages, fixed for the lifetime of the process
  pub fn total_pages(&self) -> u32 {
    if self.page_size == 0 {
      return 1;
    }
    self.total_items.div_ceil(self.page_size).max(1)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a successful query result stays fresh
  #[serde(default = "default_stale_time_secs")]
  pub stale_time_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time_secs: default_stale_time_secs(),
    }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> Duration {
    Duration::from_secs(self.stale_time_secs)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// Override for the state database location
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter directive, overridden by RUST_LOG
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
    }
  }
}

fn default_api_url() -> String {
  "https://jsonplaceholder.typicode.com".to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_page_size() -> u32 {
  5
}

fn default_total_items() -> u32 {
  100
}

fn default_stale_time_secs() -> u64 {
  5 * 60
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./postboard.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/postboard/config.yaml
  ///
  /// Unlike an explicit path, a missing default file is not an error.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("POSTBOARD_API_URL") {
      config.api.url = url;
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("postboard.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("postboard").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file deserializes to null, which means "all defaults"
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.pagination.page_size == 0 {
      return Err(eyre!("pagination.page_size must be greater than 0"));
    }
    if self.api.timeout_secs == 0 {
      return Err(eyre!("api.timeout_secs must be greater than 0"));
    }
    if self.api.url.trim().is_empty() {
      return Err(eyre!("api.url must not be empty"));
    }
    Ok(())
  }

  /// Location of the persisted state database
  pub fn state_db_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.storage.path {
      return Ok(path.clone());
    }
    Ok(data_dir()?.join("state.db"))
  }
}

/// Per-user data directory for postboard
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("postboard"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.url, "https://jsonplaceholder.typicode.com");
    assert_eq!(config.pagination.page_size, 5);
    assert_eq!(config.pagination.total_pages(), 20);
    assert_eq!(config.cache.stale_time(), Duration::from_secs(300));
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml(
      r#"
api:
  url: http://localhost:3000
pagination:
  page_size: 10
"#,
    )
    .unwrap();
    assert_eq!(config.api.url, "http://localhost:3000");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.pagination.total_pages(), 10);
  }

  #[test]
  fn test_empty_yaml_is_default() {
    let config = Config::from_yaml("   \n").unwrap();
    assert_eq!(config.pagination.total_items, 100);
  }

  #[test]
  fn test_total_pages_rounds_up() {
    let pagination = PaginationConfig {
      page_size: 7,
      total_items: 100,
    };
    assert_eq!(pagination.total_pages(), 15);
  }

  #[test]
  fn test_zero_page_size_rejected() {
    let mut config = Config::default();
    config.pagination.page_size = 0;
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_explicit_missing_path_is_error() {
    let result = Config::load(Some(Path::new("/nonexistent/postboard.yaml")));
    assert!(result.is_err());
  }
}
