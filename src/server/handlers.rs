use std::fmt::Display;

use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::page::render_page;
use super::session::{expired_cookie, session_cookie, session_id, Session};
use super::AppState;
use crate::github::{ApiError, GitHubApi};
use crate::squash::{self, steps};

#[derive(Debug, Deserialize)]
pub struct SquashForm {
    #[serde(default)]
    pub pull_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// The request's session, if its cookie names a live one.
fn current_session(state: &AppState, headers: &HeaderMap) -> Option<(String, Session)> {
    let id = session_id(headers)?;
    let session = state.sessions().get(&id)?;
    Some((id, session))
}

/// Login and token of the signed-in user.
/// Only a token GitHub rejects ends the session; other failures are returned
/// so the page can show them and the user can retry.
async fn logged_in_user(
    state: &AppState,
    session: Option<&(String, Session)>,
) -> Result<Option<(String, String)>, ApiError> {
    let Some((id, session)) = session else {
        return Ok(None);
    };
    let Some(token) = session.access_token.clone() else {
        return Ok(None);
    };

    match state.github_client(&token).current_user().await {
        Ok(login) => Ok(Some((login, token))),
        Err(error @ ApiError::Unauthorized { .. }) => {
            warn!(error = %error, status = ?error.status(), "stored access token no longer works, ending session");
            state.sessions().remove(id);
            Ok(None)
        }
        Err(error) => {
            warn!(error = %error, status = ?error.status(), "cannot look up signed-in user");
            Err(error)
        }
    }
}

/// `GET /`
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    let session = current_session(&state, &headers);
    match logged_in_user(&state, session.as_ref()).await {
        Ok(user) => Html(render_page(user.as_ref().map(|(login, _)| login.as_str()), &[], "")),
        Err(error) => Html(render_page(None, &[steps::failure(&error)], "")),
    }
}

/// `POST /`: squash the submitted pull request with the session's token.
pub async fn squash_pull_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SquashForm>,
) -> Html<String> {
    let session = current_session(&state, &headers);
    let (user, steps) = match logged_in_user(&state, session.as_ref()).await {
        Ok(Some((login, token))) => {
            info!(user = %login, pull_url = %form.pull_url, "squash requested");
            let client = state.github_client(&token);
            let outcome = squash::squash(&client, &form.pull_url, state.squash_settings()).await;
            (Some(login), outcome.steps)
        }
        Ok(None) => (None, vec![steps::failure(&"You need to log in first.")]),
        Err(error) => (None, vec![steps::failure(&error)]),
    };
    Html(render_page(user.as_deref(), &steps, &form.pull_url))
}

/// `POST /login`: start a fresh session and send the browser to GitHub.
pub async fn login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(old) = session_id(&headers) {
        state.sessions().remove(&old);
    }

    let id = state.sessions().create();
    let oauth_state = uuid::Uuid::new_v4().simple().to_string();
    state
        .sessions()
        .update(&id, |s| s.oauth_state = Some(oauth_state.clone()));

    let redirect_uri = state.redirect_uri(&headers);
    match state.oauth().authorize_url(&redirect_uri, &oauth_state) {
        Ok(url) => (
            [(header::SET_COOKIE, session_cookie(&id))],
            Redirect::to(&url),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "cannot build authorize URL");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// `GET /callback`: finish the OAuth flow and store the token in the session.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some((id, session)) = current_session(&state, &headers) else {
        return login_failed("no login in progress");
    };
    if session.access_token.is_some() {
        return Redirect::to("/").into_response();
    }

    if let Some(error) = params.error {
        return match params.error_description {
            Some(description) => login_failed(format!("{error}: {description}")),
            None => login_failed(error),
        };
    }
    if session.oauth_state.is_none() || params.state != session.oauth_state {
        return login_failed("state does not match");
    }
    let Some(code) = params.code else {
        return login_failed("no authorization code");
    };

    match state.oauth().exchange_code(&code).await {
        Ok(token) => {
            state.sessions().update(&id, |s| {
                s.access_token = Some(token);
                s.oauth_state = None;
            });
            info!("user logged in");
            Redirect::to("/").into_response()
        }
        Err(e) => login_failed(e),
    }
}

fn login_failed(reason: impl Display) -> Response {
    warn!(reason = %reason, "login failed");
    let steps = [steps::failure(&format!("Login failed: {reason}"))];
    (StatusCode::BAD_REQUEST, Html(render_page(None, &steps, ""))).into_response()
}

/// `GET /logout`
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions().remove(&id);
    }
    ([(header::SET_COOKIE, expired_cookie())], Redirect::to("/")).into_response()
}

/// `GET /health`
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
