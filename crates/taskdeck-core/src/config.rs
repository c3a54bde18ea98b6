//! Application configuration
//!
//! Configuration is resolved in three layers:
//! 1. Built-in defaults
//! 2. TOML file (`--config`, or `~/.config/taskdeck/config.toml` when present)
//! 3. Environment variables (`TASKDECK_*`, `GEMINI_*`)
//!
//! The resolved [`AppConfig`] is handed explicitly to the server and the AI
//! provider selector; nothing below this module reads the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default upper bound on a single AI dispatch
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Cloud engine settings
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Key used by the CLI; HTTP callers always supply their own
    pub api_key: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 0.3,
            max_output_tokens: 1024,
            api_key: None,
        }
    }
}

/// AI provider selector settings
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub timeout: Duration,
    pub cloud: CloudConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            cloud: CloudConfig::default(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// When false, every request acts as the local owner
    pub require_auth: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            require_auth: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Database file; `None` means the default data-dir location
    pub db_path: Option<PathBuf>,
    pub server: ServerSettings,
    pub ai: AiConfig,
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taskdeck").join("config.toml"))
}

/// Default database location
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("taskdeck").join("taskdeck.db"))
        .unwrap_or_else(|| PathBuf::from("taskdeck.db"))
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database: Option<RawDatabase>,
    server: Option<RawServer>,
    ai: Option<RawAi>,
}

#[derive(Debug, Deserialize)]
struct RawDatabase {
    path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
    require_auth: Option<bool>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawAi {
    timeout_secs: Option<u64>,
    cloud: Option<RawCloud>,
}

#[derive(Debug, Deserialize)]
struct RawCloud {
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
    api_key: Option<String>,
}

impl AppConfig {
    /// Load from an explicit file, or the default location if it exists,
    /// then overlay the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML content on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(db) = raw.database {
            config.db_path = db.path;
        }

        if let Some(server) = raw.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
            if let Some(require_auth) = server.require_auth {
                config.server.require_auth = require_auth;
            }
            if let Some(origins) = server.cors_origins {
                config.server.cors_origins = origins;
            }
        }

        if let Some(ai) = raw.ai {
            if let Some(secs) = ai.timeout_secs {
                config.ai.timeout = parse_timeout(secs)?;
            }
            if let Some(cloud) = ai.cloud {
                let target = &mut config.ai.cloud;
                if let Some(url) = cloud.base_url {
                    target.base_url = url;
                }
                if let Some(model) = cloud.model {
                    target.model = model;
                }
                if let Some(t) = cloud.temperature {
                    target.temperature = t;
                }
                if let Some(n) = cloud.max_output_tokens {
                    target.max_output_tokens = n;
                }
                target.api_key = cloud.api_key.filter(|k| !k.trim().is_empty());
            }
        }

        Ok(config)
    }

    /// Overlay environment variables using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("TASKDECK_DB") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(host) = get("TASKDECK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("TASKDECK_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(origins) = get("TASKDECK_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(timeout) = get("TASKDECK_AI_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .and_then(|s| parse_timeout(s).ok())
        {
            self.ai.timeout = timeout;
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.ai.cloud.api_key = Some(key);
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            self.ai.cloud.base_url = url;
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.ai.cloud.model = model;
        }
    }

    /// Database path, falling back to the data-dir default
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }
}

fn parse_timeout(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::Config("AI timeout must be at least 1 second".to_string()));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ai.timeout, Duration::from_secs(30));
        assert_eq!(config.ai.cloud.model, "gemini-1.5-pro");
        assert_eq!(config.ai.cloud.max_output_tokens, 1024);
        assert!(config.server.require_auth);
    }

    #[test]
    fn test_parse_toml() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            path = "/tmp/td.db"

            [server]
            port = 8080
            require_auth = false

            [ai]
            timeout_secs = 5

            [ai.cloud]
            model = "gemini-1.5-flash"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/tmp/td.db"));
        assert_eq!(config.server.port, 8080);
        assert!(!config.server.require_auth);
        assert_eq!(config.ai.timeout, Duration::from_secs(5));
        assert_eq!(config.ai.cloud.model, "gemini-1.5-flash");
        assert_eq!(config.ai.cloud.base_url, DEFAULT_GEMINI_BASE_URL);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = AppConfig::from_toml("[ai]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml("[ai]\ntimeout_secs = 5\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("TASKDECK_AI_TIMEOUT_SECS", "12"),
            ("GEMINI_API_KEY", "k-123"),
            ("GEMINI_BASE_URL", "http://127.0.0.1:9999"),
            ("TASKDECK_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.ai.timeout, Duration::from_secs(12));
        assert_eq!(config.ai.cloud.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.ai.cloud.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.server.port, 3000);
    }
}
