//! Client settings: where the API lives and how to authenticate to it.
//!
//! Each value is resolved through a chain:
//!
//! 1. `AZION_API_URL` / `AZION_TOKEN` env vars — process/session level
//! 2. `~/.azion/settings.toml` — user default
//! 3. Built-in default (API URL only)

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

/// API endpoint used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "https://api.azionapi.net";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid settings at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(
        "no API token configured: set AZION_TOKEN, \
         or add `token = \"...\"` to ~/.azion/settings.toml"
    )]
    MissingToken,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SettingsFile {
    api_url: Option<String>,
    token: Option<String>,
}

/// Resolved client settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub token: String,
}

impl Settings {
    /// Resolve settings from the environment and `~/.azion/settings.toml`.
    pub fn load() -> Result<Self, SettingsError> {
        let file = match Self::path() {
            Some(path) => read_file(&path)?,
            None => SettingsFile::default(),
        };
        resolve(
            file,
            env::var("AZION_API_URL").ok(),
            env::var("AZION_TOKEN").ok(),
        )
    }

    /// The settings file path: `~/.azion/settings.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".azion").join("settings.toml"))
    }
}

/// Read the settings file. A missing file is an empty one.
fn read_file(path: &Path) -> Result<SettingsFile, SettingsError> {
    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SettingsFile::default()),
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve(
    file: SettingsFile,
    env_api_url: Option<String>,
    env_token: Option<String>,
) -> Result<Settings, SettingsError> {
    let non_empty = |s: &String| !s.trim().is_empty();

    let api_url = env_api_url
        .filter(non_empty)
        .or(file.api_url.filter(non_empty))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let token = env_token
        .filter(non_empty)
        .or(file.token.filter(non_empty))
        .ok_or(SettingsError::MissingToken)?;

    Ok(Settings {
        api_url: api_url.trim_end_matches('/').to_string(),
        token,
    })
}
