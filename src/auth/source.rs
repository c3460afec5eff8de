use super::{CachedToken, OAuthClient, TokenStore};
use crate::error::{AppError, Result};
use google_sheets4::common::GetToken;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Authorized credential handed to the Sheets hub.
///
/// Serves the cached access token and refreshes it once it expires,
/// persisting the refreshed token back to the store.
#[derive(Clone)]
pub struct TokenSource {
    token: Arc<Mutex<CachedToken>>,
    client: OAuthClient,
    store: TokenStore,
}

impl TokenSource {
    pub fn new(token: CachedToken, client: OAuthClient, store: TokenStore) -> Self {
        Self {
            token: Arc::new(Mutex::new(token)),
            client,
            store,
        }
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if !token.is_expired() {
            return Ok(token.access_token.clone());
        }

        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            AppError::Auth("Access token expired and no refresh token is available".to_string())
        })?;

        debug!("Access token expired, refreshing...");
        let refreshed = self.client.refresh(&refresh_token).await?;
        self.store.save(&refreshed)?;
        *token = refreshed;

        Ok(token.access_token.clone())
    }
}

impl GetToken for TokenSource {
    fn get_token<'a>(
        &'a self,
        _scopes: &'a [&str],
    ) -> Pin<Box<dyn Future<Output = std::result::Result<Option<String>, BoxError>> + Send + 'a>>
    {
        Box::pin(async move {
            self.access_token()
                .await
                .map(Some)
                .map_err(|e| Box::new(e) as BoxError)
        })
    }
}
