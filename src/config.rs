//! Configuration loader and validator for the mirror scraper.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub scrape: Scrape,
    pub store: Store,
}

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    /// Profile handle to scrape, without a leading `@`.
    pub username: String,
    pub bind: String,
    pub data_dir: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            username: String::new(),
            bind: "127.0.0.1:8080".into(),
            data_dir: "./data".into(),
        }
    }
}

/// Mirror retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Scrape {
    pub mirrors: Vec<String>,
    pub user_agent: String,
    pub min_body_bytes: usize,
    pub request_timeout_secs: u64,
    pub run_timeout_secs: u64,
    /// Label reported as `source` by the scrape endpoint.
    pub source_label: String,
}

impl Default for Scrape {
    fn default() -> Self {
        Self {
            mirrors: vec![
                "https://nitter.net".into(),
                "https://nitter.lacontrevoie.fr".into(),
                "https://nitter.pussthecat.org".into(),
            ],
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".into(),
            min_body_bytes: 1000,
            request_timeout_secs: 15,
            run_timeout_secs: 60,
            source_label: "nitter".into(),
        }
    }
}

impl Scrape {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Rest,
}

/// Persistence settings. `url` and `key` are the two connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Store {
    pub backend: StoreBackend,
    pub url: String,
    pub key: String,
    pub table: String,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            url: String::new(),
            key: String::new(),
            table: "x_posts_table".into(),
        }
    }
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SCRAPE_USERNAME") {
            self.app.username = v;
        }
        if let Some(v) = lookup("STORE_URL") {
            self.store.url = v;
        }
        if let Some(v) = lookup("STORE_KEY") {
            self.store.key = v;
        }
        if self.store.backend == StoreBackend::Sqlite {
            if let Some(v) = lookup("DATABASE_URL") {
                self.store.url = v;
            }
            if self.store.url.trim().is_empty() && !self.app.data_dir.trim().is_empty() {
                self.store.url = format!("sqlite://{}/posts.db", self.app.data_dir.trim_end_matches('/'));
            }
        }
        self.app.username = self.app.username.trim().trim_start_matches('@').to_string();
    }
}

/// Load configuration from a YAML file (if present), overlay the process
/// environment and validate the result.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let mut cfg = if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)?
    } else {
        Config::default()
    };
    cfg.apply_env(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()));
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.username.trim().is_empty() {
        return Err(ConfigError::Invalid("app.username (SCRAPE_USERNAME) must be non-empty"));
    }
    if cfg.app.username.contains('/') {
        return Err(ConfigError::Invalid("app.username must not contain '/'"));
    }
    if cfg.app.bind.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind must be non-empty"));
    }

    if cfg.scrape.mirrors.is_empty() {
        return Err(ConfigError::Invalid("scrape.mirrors must list at least one mirror"));
    }
    if cfg.scrape.mirrors.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Invalid("scrape.mirrors entries must be non-empty"));
    }
    if cfg.scrape.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("scrape.request_timeout_secs must be > 0"));
    }
    if cfg.scrape.run_timeout_secs == 0 {
        return Err(ConfigError::Invalid("scrape.run_timeout_secs must be > 0"));
    }

    if cfg.store.url.trim().is_empty() {
        return Err(ConfigError::Invalid("store.url (STORE_URL) must be non-empty"));
    }
    if cfg.store.backend == StoreBackend::Rest {
        if cfg.store.key.trim().is_empty() {
            return Err(ConfigError::Invalid("store.key (STORE_KEY) must be non-empty"));
        }
        if cfg.store.table.trim().is_empty() {
            return Err(ConfigError::Invalid("store.table must be non-empty"));
        }
    }

    Ok(())
}

/// Sample configuration file.
pub fn example() -> &'static str {
    r#"app:
  username: "jack"
  bind: "127.0.0.1:8080"
  data_dir: "./data"

scrape:
  mirrors:
    - "https://nitter.net"
    - "https://nitter.lacontrevoie.fr"
    - "https://nitter.pussthecat.org"
  min_body_bytes: 1000
  request_timeout_secs: 15
  run_timeout_secs: 60
  source_label: "nitter"

store:
  backend: "rest"
  url: "https://YOUR_PROJECT.supabase.co"
  key: "YOUR_SERVICE_KEY"
  table: "x_posts_table"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Rest);
        assert_eq!(cfg.scrape.mirrors.len(), 3);
    }

    #[test]
    fn missing_username_is_fatal() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.username = " ".into();
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("username")));
    }

    #[test]
    fn rest_backend_requires_both_connection_params() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.store.url = "".into();
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("store.url")));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.store.key = "".into();
        let err = validate(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("store.key")));
    }

    #[test]
    fn invalid_scrape_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.scrape.mirrors.clear();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.scrape.request_timeout_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.scrape.run_timeout_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.apply_env(env(&[
            ("SCRAPE_USERNAME", "@Alice"),
            ("STORE_URL", "https://other.example"),
            ("STORE_KEY", "secret"),
        ]));
        assert_eq!(cfg.app.username, "Alice");
        assert_eq!(cfg.store.url, "https://other.example");
        assert_eq!(cfg.store.key, "secret");
        validate(&cfg).unwrap();
    }

    #[test]
    fn sqlite_defaults_to_data_dir_database() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[("SCRAPE_USERNAME", "alice")]));
        assert_eq!(cfg.store.url, "sqlite://./data/posts.db");
        validate(&cfg).unwrap();

        let mut cfg = Config::default();
        cfg.apply_env(env(&[("SCRAPE_USERNAME", "alice"), ("DATABASE_URL", "sqlite::memory:")]));
        assert_eq!(cfg.store.url, "sqlite::memory:");
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert!(!cfg.app.username.is_empty());
        assert_eq!(cfg.store.table, "x_posts_table");
    }
}
