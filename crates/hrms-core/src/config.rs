//! Application configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! holds the backend URL and the last email used to log in.
//!
//! Configuration is stored at `~/.config/hrms-client/config.json`. The
//! `HRMS_BACKEND_URL` environment variable takes precedence over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
const APP_NAME: &str = "hrms-client";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured backend
pub const BACKEND_URL_ENV: &str = "HRMS_BACKEND_URL";

/// Backend used when nothing is configured
const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// All endpoints live under this prefix
const API_PREFIX: &str = "/api";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub last_email: Option<String>,
}

/// `<base>/hrms-client`, for one of the platform base directories.
fn app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    base.map(|dir| dir.join(APP_NAME))
        .with_context(|| format!("Could not find {} directory", kind))
}

impl Config {
    /// Load the user's config, falling back to defaults when there is none.
    pub fn load() -> Result<Self> {
        Self::load_from(&app_dir(dirs::config_dir(), "config")?.join(CONFIG_FILE))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&app_dir(dirs::config_dir(), "config")?.join(CONFIG_FILE))
    }

    /// Directory holding the persisted session.
    pub fn data_dir(&self) -> Result<PathBuf> {
        app_dir(dirs::data_dir(), "data")
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
        match serde_json::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Ignoring malformed config file");
                Ok(Self::default())
            }
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?).context("Failed to write config file")?;
        std::fs::rename(&tmp, path).context("Failed to replace config file")?;
        Ok(())
    }

    /// Root of the REST API, honoring the environment override.
    pub fn api_url(&self) -> String {
        self.api_url_with(None)
    }

    /// Root of the REST API. Precedence: `override_url`, the environment, the file.
    pub fn api_url_with(&self, override_url: Option<&str>) -> String {
        let env = std::env::var(BACKEND_URL_ENV).ok();
        Self::resolve_api_url(override_url.or(env.as_deref()), self.backend_url.as_deref())
    }

    fn resolve_api_url(env: Option<&str>, configured: Option<&str>) -> String {
        let backend = env
            .or(configured)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BACKEND_URL)
            .trim_end_matches('/');
        if backend.ends_with(API_PREFIX) {
            backend.to_string()
        } else {
            format!("{}{}", backend, API_PREFIX)
        }
    }
}
