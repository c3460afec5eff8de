use super::{Authorizer, CachedToken, OAuthClient};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use oauth2::RedirectUrl;
use tiny_http::{Header, Response, Server};
use tracing::{debug, info, instrument, warn};
use url::Url;

// Port 0 lets the OS pick a free port
const LOCAL_BIND_ADDR: &str = "127.0.0.1:0";
const SUCCESS_PAGE: &str = "<h1>Success</h1>Authorized.";

/// Authorization-code flow that catches the redirect on a local listener.
pub struct LocalServerFlow {
    client: OAuthClient,
}

impl LocalServerFlow {
    pub fn new(client: OAuthClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Authorizer for LocalServerFlow {
    #[instrument(name = "Authorizing with Google", skip_all)]
    async fn authorize(&self) -> Result<CachedToken> {
        let server = Server::http(LOCAL_BIND_ADDR).map_err(|e| {
            AppError::Auth(format!("Failed to bind to {}: {}", LOCAL_BIND_ADDR, e))
        })?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| AppError::Auth("Local server has no IP address".to_string()))?;

        let redirect_url = RedirectUrl::new(format!("http://{}", addr))
            .map_err(|e| AppError::Auth(format!("Invalid redirect URL: {}", e)))?;
        let (auth_url, csrf_token, pkce_verifier) = self.client.authorize_url(&redirect_url);

        open_browser(&auth_url);
        info!("Authorize this app at: {}", auth_url);

        let expected_state = csrf_token.secret().clone();
        let code = tokio::task::spawn_blocking(move || wait_for_code(&server, &expected_state))
            .await
            .map_err(|e| AppError::Auth(format!("Callback listener failed: {}", e)))??;
        debug!("Got authorization code");

        self.client
            .exchange_code(code, pkce_verifier, &redirect_url)
            .await
    }
}

fn open_browser(url: &Url) {
    if let Err(e) = webbrowser::open(url.as_str()) {
        warn!("Failed to open URL in browser: {}", e);
    }
}

#[derive(Debug, PartialEq)]
enum Callback {
    NotFound,
    StateMismatch,
    NoCode,
    Code(String),
}

fn classify(request_url: &str, expected_state: &str) -> Callback {
    let Ok(url) = Url::parse(&format!("http://127.0.0.1{}", request_url)) else {
        return Callback::NoCode;
    };

    if url.path() == "/favicon.ico" {
        return Callback::NotFound;
    }

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if param("state").as_deref() != Some(expected_state) {
        return Callback::StateMismatch;
    }

    match param("code") {
        Some(code) if !code.is_empty() => Callback::Code(code),
        _ => Callback::NoCode,
    }
}

/// Block until a redirect carrying the expected state and a code arrives.
fn wait_for_code(server: &Server, expected_state: &str) -> Result<String> {
    loop {
        let request = server
            .recv()
            .map_err(|e| AppError::Auth(format!("Failed to receive request: {}", e)))?;

        let status: u16 = match classify(request.url(), expected_state) {
            Callback::Code(code) => {
                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
                        .map_err(|_| AppError::Auth("Invalid response header".to_string()))?;
                request
                    .respond(Response::from_string(SUCCESS_PAGE).with_header(content_type))
                    .map_err(|e| AppError::Auth(format!("Failed to send response: {}", e)))?;
                return Ok(code);
            }
            Callback::NotFound => 404,
            Callback::StateMismatch => {
                warn!(url = request.url(), "State doesn't match");
                500
            }
            Callback::NoCode => {
                warn!(url = request.url(), "No code from web");
                500
            }
        };

        if let Err(e) = request.respond(Response::empty(status)) {
            debug!("Failed to send response: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("/favicon.ico", "st1"), Callback::NotFound);
        assert_eq!(
            classify("/?state=st1&code=4/abc", "st1"),
            Callback::Code("4/abc".to_string())
        );
        assert_eq!(
            classify("/?state=other&code=4/abc", "st1"),
            Callback::StateMismatch
        );
        assert_eq!(classify("/?code=4/abc", "st1"), Callback::StateMismatch);
        assert_eq!(
            classify("/?state=st1&error=access_denied", "st1"),
            Callback::NoCode
        );
        assert_eq!(classify("/?state=st1&code=", "st1"), Callback::NoCode);
    }

    #[tokio::test]
    async fn test_wait_for_code_ignores_bad_requests() {
        let server = Server::http(LOCAL_BIND_ADDR).unwrap();
        let base = format!("http://{}", server.server_addr().to_ip().unwrap());
        let waiter = tokio::task::spawn_blocking(move || wait_for_code(&server, "st42"));

        let http = reqwest::Client::new();
        let get = |path: &str| http.get(format!("{}{}", base, path)).send();

        assert_eq!(get("/favicon.ico").await.unwrap().status(), 404);
        assert_eq!(get("/?state=wrong&code=x").await.unwrap().status(), 500);
        assert_eq!(get("/?state=st42").await.unwrap().status(), 500);

        let response = get("/?state=st42&code=the-code").await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("Authorized."));

        assert_eq!(waiter.await.unwrap().unwrap(), "the-code");
    }
}
