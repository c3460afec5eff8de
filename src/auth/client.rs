use super::CachedToken;
use crate::error::{AppError, Result};
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, TokenUrl,
    basic::{
        BasicClient, BasicErrorResponse, BasicRevocationErrorResponse,
        BasicTokenIntrospectionResponse, BasicTokenResponse,
    },
};
use reqwest::redirect::Policy;
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};
use url::Url;
use yup_oauth2::ApplicationSecret;

/// Read/write access to spreadsheets. Changing this requires deleting cached tokens.
pub const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

// Type alias for the client when Auth and Token URLs are set
type ConfiguredClient = Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointSet,    // HasTokenUrl
>;

/// OAuth2 client for Google's consent and token endpoints.
#[derive(Clone)]
pub struct OAuthClient {
    client: ConfiguredClient,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Build a client from a client secret JSON file (`installed` or `web`)
    pub fn from_secret_file(path: &Path) -> Result<Self> {
        let contents = fs::read(path).map_err(|e| {
            AppError::Config(format!(
                "Unable to read client secret file {:?}: {}",
                path, e
            ))
        })?;

        let secret = yup_oauth2::parse_application_secret(contents).map_err(|e| {
            AppError::Config(format!(
                "Unable to parse client secret file to config: {}",
                e
            ))
        })?;

        Self::from_secret(&secret)
    }

    pub fn from_secret(secret: &ApplicationSecret) -> Result<Self> {
        let auth_url = AuthUrl::new(secret.auth_uri.clone())
            .map_err(|e| AppError::Config(format!("Invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(secret.token_uri.clone())
            .map_err(|e| AppError::Config(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(secret.client_id.clone()))
            .set_client_secret(ClientSecret::new(secret.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        let http_client = reqwest::ClientBuilder::new()
            .redirect(Policy::none())
            .build()
            .map_err(|e| AppError::Auth(format!("Failed to build reqwest client: {}", e)))?;

        Ok(Self {
            client,
            http_client,
        })
    }

    /// Consent page URL for the fixed scope, with PKCE and offline access
    pub fn authorize_url(&self, redirect_url: &RedirectUrl) -> (Url, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_token) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(SCOPE.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .set_redirect_uri(Cow::Borrowed(redirect_url))
            .add_extra_param("access_type", "offline")
            .url();

        (url, csrf_token, pkce_verifier)
    }

    #[instrument(name = "Exchanging authorization code", skip_all)]
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
        redirect_url: &RedirectUrl,
    ) -> Result<CachedToken> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .set_redirect_uri(Cow::Borrowed(redirect_url))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Token exchange error: {:?}", e)))?;

        Ok(CachedToken::from_response(&response, None))
    }

    #[instrument(name = "Refreshing access token", skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<CachedToken> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AppError::Auth(format!("Failed to refresh token: {:?}", e)))?;

        debug!("Token refresh successful");

        Ok(CachedToken::from_response(&response, Some(refresh_token)))
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tiny_http::{Header, Response, Server};

    pub(crate) const INSTALLED_SECRET: &str = r#"{
        "installed": {
            "client_id": "123-abc.apps.googleusercontent.com",
            "project_id": "sheets-example",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
            "client_secret": "GOCSPX-secret",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    /// Token endpoint on a local port answering every request with `body`.
    /// Returns the endpoint URL and a counter of requests served.
    pub(crate) fn token_endpoint(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let url = format!("http://{}/token", server.server_addr().to_ip().unwrap());
        let requests = Arc::new(AtomicUsize::new(0));

        let counter = requests.clone();
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                counter.fetch_add(1, Ordering::SeqCst);
                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let _ = request.respond(Response::from_string(body).with_header(content_type));
            }
        });

        (url, requests)
    }

    /// Client whose token URI points at `token_url`
    pub(crate) fn client_with_token_url(token_url: &str) -> OAuthClient {
        let mut secret = yup_oauth2::parse_application_secret(INSTALLED_SECRET).unwrap();
        secret.token_uri = token_url.to_string();
        OAuthClient::from_secret(&secret).unwrap()
    }
}
