use std::path::{Path, PathBuf};
use std::time::Duration;

use nextcloud_login::{ClientConfig, PollerConfig};
use serde::{Deserialize, Serialize};

use crate::database;
use crate::error::AppError;

/// File name of the optional config file in the app directory
pub const CONFIG_FILE_NAME: &str = "talk-tv.toml";
/// Environment variable overriding `default_server`
pub const SERVER_ENV: &str = "TALK_TV_SERVER";

/// App settings, read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server preselected on the login screen
    pub default_server: Option<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_consecutive_errors: Option<u32>,
    pub session_lifetime_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let poller = PollerConfig::default();
        Self {
            default_server: None,
            user_agent: format!("TalkTV/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            poll_interval_ms: poller.interval.as_millis() as u64,
            max_consecutive_errors: poller.max_consecutive_errors,
            session_lifetime_secs: poller.session_lifetime.map(|d| d.as_secs()),
        }
    }
}

impl AppConfig {
    /// Load `talk-tv.toml` from the app directory, falling back to defaults
    pub fn load() -> Self {
        let config = match database::app_directory() {
            Ok(dir) => Self::load_in(&dir),
            Err(e) => {
                log::error!("No app directory, using default config: {}", e);
                Self::default()
            }
        };
        config.with_server_override(std::env::var(SERVER_ENV).ok())
    }

    fn load_in(dir: &Path) -> Self {
        let path = config_path_in(dir);
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Missing file means defaults
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        let config: AppConfig = toml::from_str(content)?;
        if config.poll_interval_ms == 0 {
            return Err(AppError::Config("poll_interval_ms must be positive".to_string()));
        }
        if config.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn with_server_override(mut self, server: Option<String>) -> Self {
        if let Some(server) = server.filter(|s| !s.trim().is_empty()) {
            self.default_server = Some(server);
        }
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            user_agent: self.user_agent.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..ClientConfig::default()
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_consecutive_errors: self.max_consecutive_errors,
            session_lifetime: self.session_lifetime_secs.map(Duration::from_secs),
        }
    }
}

/// Location of the config file inside the app directory
pub fn config_path_in(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Turn user input like `cloud.example.com/` into `https://cloud.example.com`
pub fn normalize_server_url(input: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Please enter a server address".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = url::Url::parse(&with_scheme)
        .map_err(|e| AppError::Validation(format!("Invalid server address: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::Validation(format!(
            "Invalid server address: {}",
            trimmed
        )));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}
