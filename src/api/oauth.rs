//! The Google OAuth 2.0 flow for an installed (Desktop App) client.
//!
//! The consent flow prints the authorization URL, waits for Google to redirect the browser to a
//! small loopback server and exchanges the code (with PKCE) for tokens. Afterwards `token.json` is
//! refreshed silently whenever the access token is about to expire.

use crate::api::files::{File, SecretFile, TokenFile};
use crate::api::OAUTH_SCOPES;
use crate::error::{ErrorType, IntoResult};
use crate::Result;
use anyhow::{bail, Context};
use chrono::TimeDelta;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::convert::Infallible;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// The loopback port the consent flow listens on for Google's redirect.
const OAUTH_CALLBACK_PORT: u16 = 8080;

/// Used when Google does not say how long an access token lives.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Holds the OAuth client and the current tokens, and keeps `token.json` up to date.
pub(crate) struct TokenProvider {
    client: OAuthClient,
    http: reqwest::Client,
    token: File<TokenFile>,
}

impl TokenProvider {
    /// Loads existing tokens. Fails if `token.json` is missing or lacks a required scope.
    pub(crate) async fn load(secret: &Path, token: &Path) -> Result<Self> {
        let secret = SecretFile::load(secret).await?;
        let token = TokenFile::load(token)
            .await
            .pub_result(ErrorType::Auth)?;
        Ok(Self {
            client: oauth_client(&secret, OAUTH_CALLBACK_PORT)?,
            http: http_client()?,
            token,
        })
    }

    /// Runs the interactive consent flow and saves the resulting tokens to `token`.
    pub(crate) async fn initialize(secret: &Path, token: &Path) -> Result<Self> {
        let secret = SecretFile::load(secret).await?;
        let listener = TcpListener::bind(("127.0.0.1", OAUTH_CALLBACK_PORT))
            .await
            .with_context(|| {
                format!("Unable to listen for the OAuth callback on port {OAUTH_CALLBACK_PORT}")
            })?;
        let client = oauth_client(&secret, OAUTH_CALLBACK_PORT)?;
        let http = http_client()?;

        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            // Without these Google does not hand out a refresh token.
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(challenge)
            .url();

        info!("Open this URL in your browser to authorize access to the sheet:\n\n{auth_url}\n");
        info!("Waiting for the authorization callback on http://localhost:{OAUTH_CALLBACK_PORT}");

        let callback = wait_for_callback(listener).await?;
        if callback.state != *csrf.secret() {
            bail!("The OAuth callback state does not match, the authorization was not started here");
        }

        let response = client
            .exchange_code(AuthorizationCode::new(callback.code))
            .set_pkce_verifier(verifier)
            .request_async(&http)
            .await
            .context("Failed to exchange the authorization code for tokens")
            .pub_result(ErrorType::Auth)?;

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .context("Google did not return a refresh token")
            .pub_result(ErrorType::Auth)?;
        let scopes = match response.scopes() {
            Some(granted) => granted.iter().map(|s| s.to_string()).collect(),
            None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
        };
        let data = TokenFile::new(
            scopes,
            response.access_token().secret().to_string(),
            refresh_token,
            lifetime(response.expires_in())?,
        );
        let token = File::new(token, data);
        token.save().await?;
        info!("Authorization successful, tokens saved to {}", token.path().display());

        Ok(Self {
            client,
            http,
            token,
        })
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing the OAuth access token");
        let refresh_token = RefreshToken::new(self.token.data().refresh_token().to_string());
        let response = self
            .client
            .exchange_refresh_token(&refresh_token)
            .request_async(&self.http)
            .await
            .context("Failed to refresh the OAuth access token")
            .pub_result(ErrorType::Auth)?;

        let expires_in = lifetime(response.expires_in())?;
        self.token.data_mut().update(
            response.access_token().secret().to_string(),
            expires_in,
            response.refresh_token().map(|t| t.secret().to_string()),
        );
        self.token.save().await?;
        debug!("Token valid until {}", self.token.data().expires_at());
        Ok(())
    }

    /// The current access token, without checking whether it has expired.
    pub(crate) fn token(&self) -> &str {
        self.token.data().access_token()
    }

    /// The current access token, refreshed first if it has expired or is about to.
    pub(crate) async fn token_with_refresh(&mut self) -> Result<&str> {
        if self.token.data().is_expired() {
            self.refresh().await?;
        }
        Ok(self.token())
    }
}

fn oauth_client(secret: &SecretFile, port: u16) -> Result<OAuthClient> {
    Ok(BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?)
        .set_redirect_uri(
            RedirectUrl::new(format!("http://localhost:{port}")).context("Invalid redirect URI")?,
        ))
}

/// The token endpoint must not follow redirects, see the `oauth2` crate docs.
fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the OAuth HTTP client")
}

fn lifetime(expires_in: Option<std::time::Duration>) -> Result<TimeDelta> {
    match expires_in {
        Some(d) => TimeDelta::from_std(d).context("The token lifetime is out of range"),
        None => Ok(TimeDelta::seconds(DEFAULT_TOKEN_LIFETIME_SECS)),
    }
}

/// The query parameters Google sends to the redirect URI.
#[derive(Debug, Clone, Eq, PartialEq)]
struct Callback {
    code: String,
    state: String,
}

/// Serves HTTP on `listener` until a request arrives that carries either an authorization code or
/// an error. Other requests, such as the browser asking for a favicon, get a 404.
async fn wait_for_callback(listener: TcpListener) -> Result<Callback> {
    let (tx, mut rx) = mpsc::channel::<std::result::Result<Callback, String>>(1);
    loop {
        tokio::select! {
            Some(result) = rx.recv() => {
                return result
                    .map_err(|e| anyhow::anyhow!("Authorization was denied: {e}"))
                    .pub_result(ErrorType::Auth);
            }
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Failed to accept the OAuth callback")?;
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let tx = tx.clone();
                        async move { Ok::<_, Infallible>(handle_callback(&req, &tx)) }
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("OAuth callback connection failed: {e}");
                    }
                });
            }
        }
    }
}

fn handle_callback(
    req: &Request<Incoming>,
    tx: &mpsc::Sender<std::result::Result<Callback, String>>,
) -> Response<String> {
    let Some(result) = parse_callback(req.uri().query().unwrap_or_default()) else {
        return respond(StatusCode::NOT_FOUND, "Not found");
    };
    let page = match &result {
        Ok(_) => "Authorization complete. You can close this tab and return to the terminal.",
        Err(_) => "Authorization failed. Check the terminal for details.",
    };
    // Only the first callback matters, later ones find the channel full or closed.
    let _ = tx.try_send(result);
    respond(StatusCode::OK, page)
}

fn respond(status: StatusCode, body: &str) -> Response<String> {
    let mut response = Response::new(body.to_string());
    *response.status_mut() = status;
    response
}

/// `None` when the query has neither `code` nor `error`.
fn parse_callback(query: &str) -> Option<std::result::Result<Callback, String>> {
    let mut code = None;
    let mut state = String::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = value.into_owned(),
            "error" => return Some(Err(value.into_owned())),
            _ => {}
        }
    }
    code.map(|code| Ok(Callback { code, state }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_code() {
        let parsed = parse_callback("state=abc&code=4%2F0AY&scope=x").unwrap();
        assert_eq!(
            Ok(Callback {
                code: "4/0AY".into(),
                state: "abc".into()
            }),
            parsed
        );
    }

    #[test]
    fn test_parse_callback_error() {
        let parsed = parse_callback("error=access_denied&state=abc").unwrap();
        assert_eq!(Err("access_denied".to_string()), parsed);
    }

    #[test]
    fn test_parse_callback_unrelated() {
        assert!(parse_callback("").is_none());
        assert!(parse_callback("foo=bar").is_none());
    }

    #[test]
    fn test_lifetime() {
        assert_eq!(TimeDelta::hours(1), lifetime(None).unwrap());
        assert_eq!(
            TimeDelta::seconds(3599),
            lifetime(Some(std::time::Duration::from_secs(3599))).unwrap()
        );
    }
}
