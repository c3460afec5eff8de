use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const CONFIG_DIR_PREFIX: &str = "googlesheets";
const CONFIG_FILE_NAME: &str = "config.toml";

const DEFAULT_CLIENT_SECRET_FILE: &str = "client_secret.json";
const DEFAULT_CACHE_FILE_NAME: &str = "googlesheets-example.json";
const DEFAULT_RANGE: &str = "A1:B";

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub google: GoogleConfig,
    pub sheet: SheetConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GoogleConfig {
    /// Client secret JSON downloaded from the Google Cloud console
    pub client_secret_file: PathBuf,
    /// Name of the token cache file under ~/.google_oauth_credentials
    pub cache_file_name: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_secret_file: PathBuf::from(DEFAULT_CLIENT_SECRET_FILE),
            cache_file_name: DEFAULT_CACHE_FILE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SheetConfig {
    pub range: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_RANGE.to_string(),
        }
    }
}

impl Config {
    /// Load the optional config file, falling back to defaults when it doesn't exist
    pub fn load() -> Result<Self> {
        let Some(config_path) = Self::xdg_dirs().find_config_file(CONFIG_FILE_NAME) else {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        debug!(path = ?config_path, "Loading config file");
        let contents = fs::read_to_string(&config_path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        if config.google.cache_file_name.is_empty() {
            return Err(AppError::Config(
                "google.cache_file_name must not be empty".to_string(),
            ));
        }

        if config.sheet.range.is_empty() {
            return Err(AppError::Config(
                "sheet.range must not be empty".to_string(),
            ));
        }

        Ok(config)
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            google: GoogleConfig {
                client_secret_file: PathBuf::from("/etc/secret.json"),
                cache_file_name: "work".to_string(),
            },
            sheet: SheetConfig {
                range: "Sheet1!A1:C".to_string(),
            },
        };

        let serialized = toml::to_string(&config).unwrap();
        let deserialized = Config::parse(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_config_defaults_for_missing_keys() {
        let config = Config::parse("[google]\ncache_file_name = \"other\"\n").unwrap();

        assert_eq!(config.google.cache_file_name, "other");
        assert_eq!(
            config.google.client_secret_file,
            PathBuf::from(DEFAULT_CLIENT_SECRET_FILE)
        );
        assert_eq!(config.sheet.range, DEFAULT_RANGE);
    }

    #[test]
    fn test_config_empty_file() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_config_rejects_empty_range() {
        let err = Config::parse("[sheet]\nrange = \"\"\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_config_rejects_invalid_toml() {
        let err = Config::parse("[google\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)), "got {:?}", err);
    }
}
