use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    constants::{CACHE_TIMEOUT, NETWORK_TIMEOUT, PAGINATION_PAGE_SIZE},
    resource::CallTimeouts,
};

pub const DEFAULT_CONFIG_FILE: &str = "chores.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub database_url: String,
    pub network_timeout: Duration,
    pub cache_timeout: Duration,
    pub page_size: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000/api/".into(),
            database_url: "sqlite://./data/chores.db".into(),
            network_timeout: NETWORK_TIMEOUT,
            cache_timeout: CACHE_TIMEOUT,
            page_size: PAGINATION_PAGE_SIZE,
        }
    }
}

impl ClientSettings {
    pub fn timeouts(&self) -> CallTimeouts {
        CallTimeouts {
            network: self.network_timeout,
            cache: self.cache_timeout,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    server_url: Option<String>,
    database_url: Option<String>,
    network_timeout_ms: Option<u64>,
    cache_timeout_ms: Option<u64>,
    page_size: Option<u32>,
}

/// Loads settings from `path` (or `chores.toml` in the working directory,
/// which may be absent) and then applies environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<ClientSettings, SettingsError> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

pub fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ClientSettings, SettingsError> {
    let mut settings = ClientSettings::default();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file: FileSettings =
                toml::from_str(&raw).map_err(|source| SettingsError::Parse {
                    path: path.clone(),
                    source,
                })?;
            apply_file(&mut settings, file);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {}
        Err(source) => return Err(SettingsError::Read { path, source }),
    }

    if let Some(v) = env("CHORES_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("CHORES_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__NETWORK_TIMEOUT_MS") {
        settings.network_timeout = Duration::from_millis(parse("APP__NETWORK_TIMEOUT_MS", v)?);
    }
    if let Some(v) = env("APP__CACHE_TIMEOUT_MS") {
        settings.cache_timeout = Duration::from_millis(parse("APP__CACHE_TIMEOUT_MS", v)?);
    }
    if let Some(v) = env("APP__PAGE_SIZE") {
        settings.page_size = parse("APP__PAGE_SIZE", v)?;
    }

    if settings.page_size == 0 {
        return Err(SettingsError::InvalidValue {
            name: "page_size",
            value: "0".into(),
        });
    }

    Ok(settings)
}

fn apply_file(settings: &mut ClientSettings, file: FileSettings) {
    if let Some(v) = file.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file.network_timeout_ms {
        settings.network_timeout = Duration::from_millis(v);
    }
    if let Some(v) = file.cache_timeout_ms {
        settings.cache_timeout = Duration::from_millis(v);
    }
    if let Some(v) = file.page_size {
        settings.page_size = v;
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidValue { name, value })
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
