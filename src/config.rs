//! Configuration loader and validator for the catalog service.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
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
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub analytics: Analytics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default)]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Auth {
    #[serde(default)]
    pub tokens: Vec<TokenEntry>,
}

/// One accepted bearer token and the identity it resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenEntry {
    pub token: String,
    pub id: String,
    pub username: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "admin".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Analytics {
    #[serde(default = "default_trend_months")]
    pub trend_months: u32,
    #[serde(default = "default_featured_categories")]
    pub featured_categories: u32,
}

fn default_trend_months() -> u32 {
    12
}

fn default_featured_categories() -> u32 {
    8
}

impl Default for Analytics {
    fn default() -> Self {
        Self {
            trend_months: default_trend_months(),
            featured_categories: default_featured_categories(),
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

    /// `DATABASE_URL` wins, then `app.database_url`, then a file under `data_dir`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.app.database_url.clone())
            .unwrap_or_else(|| {
                format!(
                    "sqlite://{}/knitinfo.db",
                    self.app.data_dir.trim_end_matches('/')
                )
            })
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if let Some(url) = &cfg.app.database_url {
        if url.trim().is_empty() {
            return Err(ConfigError::Invalid("app.database_url must be non-empty when set"));
        }
    }

    let mut seen = HashSet::new();
    for entry in &cfg.auth.tokens {
        if entry.token.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.tokens[].token must be non-empty"));
        }
        if entry.username.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.tokens[].username must be non-empty"));
        }
        if !seen.insert(entry.token.as_str()) {
            return Err(ConfigError::Invalid("auth.tokens[].token must be unique"));
        }
    }

    if cfg.analytics.trend_months == 0 {
        return Err(ConfigError::Invalid("analytics.trend_months must be > 0"));
    }
    if cfg.analytics.featured_categories == 0 {
        return Err(ConfigError::Invalid("analytics.featured_categories must be > 0"));
    }

    Ok(())
}

/// Example configuration document.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

auth:
  tokens:
    - token: "CHANGE_ME_ADMIN_TOKEN"
      id: "1"
      username: "admin"
      role: "admin"

analytics:
  trend_months: 12
  featured_categories: 8
"#
}
