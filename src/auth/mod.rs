mod client;
mod flow;
mod source;
mod store;
mod token;

pub use client::{OAuthClient, SCOPE};
pub use flow::LocalServerFlow;
pub use source::TokenSource;
pub use store::TokenStore;
pub use token::CachedToken;

use crate::config::GoogleConfig;
use crate::error::Result;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Interactive step that obtains a fresh token from the user.
#[async_trait]
pub trait Authorizer {
    async fn authorize(&self) -> Result<CachedToken>;
}

/// Return the cached token, or run the authorizer and cache its result.
pub async fn obtain_token<A>(store: &TokenStore, authorizer: &A) -> Result<CachedToken>
where
    A: Authorizer + Sync,
{
    if let Some(token) = store.load()? {
        debug!(path = ?store.path(), "Using cached token");
        return Ok(token);
    }

    debug!("No usable cached token, starting authorization");
    let token = authorizer.authorize().await?;
    store.save(&token)?;

    Ok(token)
}

/// Build an authorized token source from the client secret and token cache
#[instrument(name = "Authenticating to Google Sheets", skip_all)]
pub async fn authorize(config: &GoogleConfig) -> Result<TokenSource> {
    let client = OAuthClient::from_secret_file(&config.client_secret_file)?;
    let store = TokenStore::new(&config.cache_file_name)?;

    let token = obtain_token(&store, &LocalServerFlow::new(client.clone())).await?;

    Ok(TokenSource::new(token, client, store))
}
