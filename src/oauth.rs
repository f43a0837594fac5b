//! OAuth2 authorization-code flow against GitHub's login endpoints.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::{Config, ConfigError};
use crate::github::failure_message;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid authorize URL: {0}")]
    AuthorizeUrl(#[from] url::ParseError),

    #[error("Token request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GitHub answered but refused the code.
    #[error("{0}")]
    Rejected(String),
}

pub struct OAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    authorize_url: String,
    token_url: String,
    scope: String,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Result<Self, ConfigError> {
        let (client_id, client_secret) = config.oauth_client()?;
        Ok(Self {
            http,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authorize_url: config.oauth.authorize_url.clone(),
            token_url: config.oauth.token_url.clone(),
            scope: config.oauth.scope.clone(),
        })
    }

    /// Where to send the browser to start a login.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, OAuthError> {
        let url = url::Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", self.scope.as_str()),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchange the `code` from the callback for an access token.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if status != 200 && status != 201 {
            let message = failure_message(status, &body);
            warn!(status, error = %message, "token exchange failed");
            return Err(OAuthError::Rejected(message));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| OAuthError::Rejected(format!("unreadable token response: {e}")))?;
        match (token.access_token, token.error) {
            (_, Some(error)) => {
                let message = match token.error_description {
                    Some(description) => format!("{error}: {description}"),
                    None => error,
                };
                warn!(error = %message, "token exchange rejected");
                Err(OAuthError::Rejected(message))
            }
            (Some(access_token), None) => {
                debug!("obtained access token");
                Ok(access_token)
            }
            (None, None) => Err(OAuthError::Rejected(
                "token response carried no access token".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    fn client(token_url: String) -> OAuthClient {
        let mut config = Config::default();
        config.oauth.client_id = Some("Iv1.abc".to_string());
        config.oauth.client_secret = Some("shh".to_string());
        config.oauth.token_url = token_url;
        let http = crate::github::build_http_client(Duration::from_secs(5)).unwrap();
        OAuthClient::new(http, &config).unwrap()
    }

    #[test]
    fn test_new_requires_client_pair() {
        let http = crate::github::build_http_client(Duration::from_secs(5)).unwrap();
        assert!(OAuthClient::new(http, &Config::default()).is_err());
    }

    #[test]
    fn test_authorize_url_carries_parameters() {
        let url = client("https://unused".to_string())
            .authorize_url("http://localhost:5000/callback", "st4te")
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        assert_eq!(parsed.host_str(), Some("github.com"));
        assert_eq!(parsed.path(), "/login/oauth/authorize");
        let params: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert!(params.contains(&("client_id".to_string(), "Iv1.abc".to_string())));
        assert!(params.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:5000/callback".to_string()
        )));
        assert!(params.contains(&("scope".to_string(), "repo,user".to_string())));
        assert!(params.contains(&("state".to_string(), "st4te".to_string())));
    }

    #[tokio::test]
    async fn test_exchange_code_returns_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login/oauth/access_token")
            .match_header("accept", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "client_id": "Iv1.abc",
                "client_secret": "shh",
                "code": "c0de"
            })))
            .with_status(200)
            .with_body(r#"{"access_token":"gho_abc","token_type":"bearer","scope":"repo,user"}"#)
            .create_async()
            .await;

        let token = client(format!("{}/login/oauth/access_token", server.url()))
            .exchange_code("c0de")
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(token, "gho_abc");
    }

    #[tokio::test]
    async fn test_exchange_code_rejected_in_200_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"error":"bad_verification_code","error_description":"The code passed is incorrect or expired."}"#)
            .create_async()
            .await;

        let err = client(format!("{}/token", server.url()))
            .exchange_code("stale")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad_verification_code: The code passed is incorrect or expired."
        );
    }

    #[tokio::test]
    async fn test_exchange_code_http_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(500)
            .create_async()
            .await;

        let err = client(format!("{}/token", server.url()))
            .exchange_code("c0de")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed with code 500");
    }
}
