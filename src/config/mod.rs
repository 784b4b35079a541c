//! Runtime configuration.
//!
//! Defaults, then an optional JSON file, then `PORTICO_*` environment
//! variables. Later sources win.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PorticoError, Result};

/// File picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "portico.json";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = PorticoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(PorticoError::Config(format!("unknown log format '{other}'"))),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the upstream JSON API.
    pub api_url: String,
    /// Tenant used when a request names none.
    pub default_tenant: String,
    /// Root directory of the durable cache.
    pub cache_dir: PathBuf,
    /// Secret required by the update and delete routes. Unset or empty
    /// rejects every mutating request.
    pub access_key: Option<String>,
    /// Endpoints seeded for every initialized tenant.
    pub endpoints: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub server: ServerConfig,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            default_tenant: "undefined".to_string(),
            cache_dir: PathBuf::from("./cache"),
            access_key: None,
            endpoints: Vec::new(),
            fetch_timeout_secs: 30,
            server: ServerConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Config file location: `PORTICO_CONFIG` if set, else `./portico.json`.
    pub fn path() -> PathBuf {
        std::env::var("PORTICO_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load from an explicit file (which must exist), or from
    /// [`Config::path`] when it exists, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = Self::path();
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    debug!(path = %path.display(), "No config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a JSON config file. Missing fields take their defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            PorticoError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&data)
            .map_err(|e| PorticoError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Apply `PORTICO_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORTICO_API_URL") {
            self.api_url = v;
        }
        if let Some(v) = lookup("PORTICO_DEFAULT_TENANT").filter(|v| !v.trim().is_empty()) {
            self.default_tenant = v;
        }
        if let Some(v) = lookup("PORTICO_CACHE_DIR") {
            self.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PORTICO_ACCESS_KEY") {
            self.access_key = Some(v);
        }
        if let Some(v) = lookup("PORTICO_ENDPOINTS") {
            self.endpoints = parse_list(&v);
        }
        if let Some(v) = lookup("PORTICO_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = parse_env("PORTICO_FETCH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("PORTICO_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("PORTICO_PORT") {
            self.server.port = parse_env("PORTICO_PORT", &v)?;
        }
        if let Some(v) = lookup("PORTICO_LOG_FORMAT") {
            self.log_format = v.parse()?;
        }
        Ok(())
    }

    /// Checks that only matter once the HTTP server or upstream is used.
    pub fn validate_for_serving(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(PorticoError::Config(
                "api_url is not set (PORTICO_API_URL)".into(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(PorticoError::Config(
                "fetch_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// The configured access key, treating an empty value as unset.
    pub fn access_key(&self) -> Option<&str> {
        self.access_key.as_deref().filter(|k| !k.is_empty())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PorticoError::Config(format!("invalid value for {key}: '{raw}'")))
}

// ============================================================================
// Tests
// ============================================================================
