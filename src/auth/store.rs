use super::CachedToken;
use crate::error::{AppError, Result};
use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

const CREDENTIALS_DIR: &str = ".google_oauth_credentials";
const CACHE_FILE_SUFFIX: &str = ".json";

/// Single-file JSON token cache.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Token store at `~/.google_oauth_credentials/<cache_file_name>`
    pub fn new(cache_file_name: &str) -> Result<Self> {
        let base_dirs = directories::BaseDirs::new()
            .ok_or_else(|| AppError::Config("Failed to determine home directory".to_string()))?;

        Ok(Self::in_dir(
            base_dirs.home_dir().join(CREDENTIALS_DIR),
            cache_file_name,
        ))
    }

    pub fn in_dir(dir: impl Into<PathBuf>, cache_file_name: &str) -> Self {
        Self {
            path: dir.into().join(cache_file_name_for(cache_file_name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached token. Unreadable or invalid files count as no token.
    pub fn load(&self) -> Result<Option<CachedToken>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "No cached token");
                return Ok(None);
            }
            Err(e) => {
                warn!(path = ?self.path, "Failed to read cached token: {}", e);
                return Ok(None);
            }
        };

        match serde_json::from_str::<CachedToken>(&contents) {
            Ok(token) if token.is_valid() => Ok(Some(token)),
            Ok(_) => {
                warn!(path = ?self.path, "Cached token has no access token");
                Ok(None)
            }
            Err(e) => {
                warn!(path = ?self.path, "Failed to parse cached token: {}", e);
                Ok(None)
            }
        }
    }

    pub fn save(&self, token: &CachedToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(parent)
                .map_err(|e| {
                    AppError::Auth(format!("Failed to create token cache directory: {}", e))
                })?;
        }

        let contents = serde_json::to_string_pretty(token)
            .map_err(|e| AppError::Auth(format!("Failed to serialize token: {}", e)))?;

        // Owner-only permissions from creation
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&self.path)
            .map_err(|e| AppError::Auth(format!("Unable to cache oauth token: {}", e)))?;

        file.write_all(contents.as_bytes())
            .map_err(|e| AppError::Auth(format!("Unable to cache oauth token: {}", e)))?;

        info!(path = ?self.path, "Saved credential file");

        Ok(())
    }

    #[instrument(name = "Clearing cached token", skip_all)]
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = ?self.path, "Cleared cached token");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cached token to clear");
                Ok(())
            }
            Err(e) => Err(AppError::Auth(format!(
                "Failed to delete token file: {}",
                e
            ))),
        }
    }
}

/// Append the `.json` suffix if missing and query-escape the name
fn cache_file_name_for(cache_file_name: &str) -> String {
    let name = match cache_file_name.ends_with(CACHE_FILE_SUFFIX) {
        true => cache_file_name.to_string(),
        false => format!("{}{}", cache_file_name, CACHE_FILE_SUFFIX),
    };

    url::form_urlencoded::byte_serialize(name.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::test_helpers::mock_token;
    use chrono::{TimeZone, Utc};
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_cache_file_name() {
        assert_eq!(cache_file_name_for("example"), "example.json");
        assert_eq!(cache_file_name_for("example.json"), "example.json");
        assert_eq!(cache_file_name_for("my sheet"), "my+sheet.json");
        assert_eq!(cache_file_name_for("../escape"), "..%2Fescape.json");
    }

    #[test]
    fn test_token_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(dir.path(), "roundtrip");
        let token = mock_token(Some(Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()));

        store.save(&token).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, Some(token));
        assert_eq!(store.path(), dir.path().join("roundtrip.json"));
    }

    #[test]
    fn test_save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(dir.path(), "overwrite");

        store.save(&mock_token(None)).unwrap();
        let newer = CachedToken {
            access_token: "ya29.newer".to_string(),
            refresh_token: None,
            ..mock_token(None)
        };
        store.save(&newer).unwrap();

        assert_eq!(store.load().unwrap(), Some(newer));
    }

    #[test]
    fn test_save_restricts_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("credentials");
        let store = TokenStore::in_dir(&cache_dir, "perms");

        store.save(&mock_token(None)).unwrap();

        let file_mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
        let dir_mode = fs::metadata(&cache_dir).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(dir.path(), "missing");

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(dir.path(), "corrupt");
        fs::write(store.path(), "{not json").unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_load_empty_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(dir.path(), "empty");
        fs::write(store.path(), r#"{"access_token": "", "token_type": "Bearer"}"#).unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::in_dir(dir.path(), "clear");

        store.save(&mock_token(None)).unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());

        // Clearing again is not an error
        store.clear().unwrap();
    }
}
