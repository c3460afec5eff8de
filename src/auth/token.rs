use chrono::{DateTime, Datelike, Duration, Utc};
use oauth2::TokenResponse;
use oauth2::basic::{BasicTokenResponse, BasicTokenType};
use serde::{Deserialize, Deserializer, Serialize};

/// Tokens are considered expired this long before their actual expiry
const EXPIRY_DELTA_SECS: i64 = 10;

/// OAuth token as persisted in the token cache file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

/// Go's oauth2 writes a missing expiry as the zero time `0001-01-01T00:00:00Z`
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|e| e.year() > 1))
}

impl CachedToken {
    /// Build a token from a token endpoint response.
    ///
    /// Refresh responses usually omit the refresh token, in which case
    /// `fallback_refresh_token` is carried over.
    pub fn from_response(
        response: &BasicTokenResponse,
        fallback_refresh_token: Option<&str>,
    ) -> Self {
        let token_type = match response.token_type() {
            BasicTokenType::Bearer => "Bearer".to_string(),
            BasicTokenType::Mac => "MAC".to_string(),
            BasicTokenType::Extension(other) => other.clone(),
        };

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or_else(|| fallback_refresh_token.map(str::to_string));

        let expiry = response
            .expires_in()
            .and_then(|d| Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        Self {
            access_token: response.access_token().secret().clone(),
            token_type,
            refresh_token,
            expiry,
        }
    }

    /// A token without an expiry never expires
    pub fn is_expired(&self) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_DELTA_SECS) < Utc::now(),
            None => false,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        !self.access_token.is_empty()
    }
}
