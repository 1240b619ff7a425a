use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::codec::BACKUP_FILE_NAME;
use crate::sync::BACKUP_FOLDER_NAME;

pub const CLIENT_ID_PLACEHOLDER: &str = "PASTE_YOUR_CLIENT_ID_HERE";
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigFile {
    pub drive: DriveFileSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DriveFileSection {
    pub client_id: Option<String>,
    pub folder_name: Option<String>,
    pub file_name: Option<String>,
    pub api_base_url: Option<String>,
    pub upload_base_url: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Resolved remote backup settings. Command-line and environment values win
/// over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveSettings {
    client_id: Option<String>,
    pub folder_name: String,
    pub file_name: String,
    pub api_base_url: String,
    pub upload_base_url: String,
    pub redirect_uri: String,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            folder_name: BACKUP_FOLDER_NAME.to_string(),
            file_name: BACKUP_FILE_NAME.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }
}

impl DriveSettings {
    pub fn resolve(file: ConfigFile, client_id_override: Option<String>) -> Self {
        let defaults = Self::default();
        let section = file.drive;
        Self {
            client_id: client_id_override.or(section.client_id),
            folder_name: section.folder_name.unwrap_or(defaults.folder_name),
            file_name: section.file_name.unwrap_or(defaults.file_name),
            api_base_url: section.api_base_url.unwrap_or(defaults.api_base_url),
            upload_base_url: section.upload_base_url.unwrap_or(defaults.upload_base_url),
            redirect_uri: section.redirect_uri.unwrap_or(defaults.redirect_uri),
        }
    }

    /// The OAuth client id, rejected when missing or still the placeholder.
    pub fn client_id(&self) -> Result<&str, ConfigError> {
        match self.client_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() && id != CLIENT_ID_PLACEHOLDER => Ok(id),
            _ => Err(ConfigError::MissingClientId),
        }
    }
}

/// Reads the TOML config. A missing file at the default location is not an error.
pub fn load_config_file(path: &Path, explicit: bool) -> Result<ConfigFile, ConfigError> {
    if !path.exists() && !explicit {
        return Ok(ConfigFile::default());
    }
    let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    toml::from_str(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        source: err,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    MissingClientId,
    InvalidUrl {
        key: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read config '{}': {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "invalid config '{}': {}", path.display(), source)
            }
            ConfigError::MissingClientId => write!(
                f,
                "OAuth client id is not configured; set drive.client_id or VISIT_PLANNER_CLIENT_ID"
            ),
            ConfigError::InvalidUrl { key, value } => {
                write!(f, "drive.{} is not a valid URL: '{}'", key, value)
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::MissingClientId => None,
            ConfigError::InvalidUrl { .. } => None,
        }
    }
}
