//! HTTP front end of the squasher.
//!
//! # Endpoints
//!
//! - `GET /` - page with login state and the squash form
//! - `POST /` - squash the pull request in form field `pull_url`
//! - `POST /login` - start the GitHub OAuth flow
//! - `GET /callback` - finish the OAuth flow
//! - `GET /logout` - forget the session
//! - `GET /health` - returns 200 if the server is running

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use thiserror::Error;
use tracing::info;

pub mod handlers;
pub mod page;
pub mod session;

use crate::config::{Config, ConfigError};
use crate::github::{build_http_client, GitHubClient};
use crate::oauth::OAuthClient;
use crate::squash::SquashSettings;
use session::SessionStore;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state, passed to handlers via Axum's `State` extractor.
///
/// Only the session map is mutable. Each squash gets its own `GitHubClient`
/// built from the caller's token.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    http: reqwest::Client,
    oauth: OAuthClient,
    sessions: SessionStore,
    settings: SquashSettings,
}

impl AppState {
    /// Fails when the OAuth client id/secret are not configured.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let http = build_http_client(config.request_timeout())?;
        let oauth = OAuthClient::new(http.clone(), &config)?;
        let settings = config.squash_settings();
        let sessions = SessionStore::with_ttl(config.session_ttl());
        Ok(AppState {
            inner: Arc::new(AppStateInner {
                config,
                http,
                oauth,
                sessions,
                settings,
            }),
        })
    }

    /// Client acting as the user who owns `token`.
    pub fn github_client(&self, token: &str) -> GitHubClient {
        GitHubClient::new(self.inner.http.clone(), &self.inner.config.github.api_url, token)
    }

    pub fn oauth(&self) -> &OAuthClient {
        &self.inner.oauth
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub fn squash_settings(&self) -> &SquashSettings {
        &self.inner.settings
    }

    /// OAuth callback URL: the configured one, else `/callback` on the requested host.
    /// Behind a TLS-terminating proxy the scheme comes from `X-Forwarded-Proto`.
    pub fn redirect_uri(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.inner.config.oauth.redirect_url {
            return url.clone();
        }
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");
        let scheme = match headers
            .get("x-forwarded-proto")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
        {
            Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
            _ => "http",
        };
        format!("{scheme}://{host}/callback")
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route(
            "/",
            get(handlers::index).post(handlers::squash_pull_request),
        )
        .route("/login", post(handlers::login))
        .route("/callback", get(handlers::callback))
        .route("/logout", get(handlers::logout))
        .route("/health", get(handlers::health))
        .with_state(app_state)
}

/// Bind `bind` and serve until the process is stopped.
pub async fn serve(config: Config, bind: &str) -> Result<(), ServerError> {
    let app = build_router(AppState::new(config)?);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
