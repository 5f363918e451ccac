//! Configuration resolution.
//!
//! Settings come from a TOML file (`~/.config/pipeboard/config.toml` unless
//! overridden) with `PIPEBOARD_*` environment variables taking precedence.
//! Resolution validates everything up front through [`ConfigError`]; a bad
//! key aborts startup instead of surfacing mid-command.

mod helpers;

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use helpers::{optional_env, parse_bool_env};

const CONFIG_DIR: &str = "pipeboard";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_ENDPOINT: &str = "https://api.pipeboard.dev";

/// Raw on-disk settings. Every field is optional; [`Config::resolve`] fills
/// defaults and applies env overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub store: StoreSection,
    pub output: OutputSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub endpoint: Option<String>,
    pub api_token: Option<String>,
    pub offline: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub color: Option<bool>,
    pub json_logs: Option<bool>,
}

/// Hosted-store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint: Url,
    pub api_token: Option<SecretString>,
    /// Run against the in-memory backend with a demo user instead of the
    /// hosted store.
    pub offline: bool,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub color: bool,
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub output: OutputConfig,
}

fn validate_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "PIPEBOARD_STORE_ENDPOINT".to_string(),
            message: "endpoint must not be empty".to_string(),
        });
    }
    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        key: "PIPEBOARD_STORE_ENDPOINT".to_string(),
        message: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidValue {
            key: "PIPEBOARD_STORE_ENDPOINT".to_string(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn read_settings(path: &Path) -> Result<SettingsFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl Config {
    /// Load the settings file (if any) and resolve the final configuration.
    ///
    /// `path_override` comes from `--config`; when set, the file must exist.
    /// The default location is allowed to be absent.
    pub fn load(path_override: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path_override {
            Some(path) => read_settings(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_settings(&path)?,
                _ => SettingsFile::default(),
            },
        };
        Self::resolve(&settings)
    }

    pub(crate) fn resolve(settings: &SettingsFile) -> Result<Self, ConfigError> {
        let endpoint_raw = optional_env("PIPEBOARD_STORE_ENDPOINT")?
            .or_else(|| settings.store.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let api_token = optional_env("PIPEBOARD_API_TOKEN")?
            .or_else(|| settings.store.api_token.clone())
            .map(|raw| SecretString::from(raw));

        Ok(Self {
            store: StoreConfig {
                endpoint: validate_endpoint(&endpoint_raw)?,
                api_token,
                offline: parse_bool_env(
                    "PIPEBOARD_OFFLINE",
                    settings.store.offline.unwrap_or(false),
                )?,
            },
            output: OutputConfig {
                color: parse_bool_env("PIPEBOARD_COLOR", settings.output.color.unwrap_or(true))?,
                json_logs: parse_bool_env(
                    "PIPEBOARD_JSON_LOGS",
                    settings.output.json_logs.unwrap_or(false),
                )?,
            },
        })
    }
}
