use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::pr::Committer;
use crate::squash::SquashSettings;

pub const DEFAULT_CONFIG_FILE: &str = ".squasher.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("OAuth client id and secret must be configured (SQUASHER_CLIENT_ID / SQUASHER_CLIENT_SECRET)")]
    MissingOAuthClient,

    #[error("GitHub token not found in config or GITHUB_TOKEN")]
    MissingToken,
}

/// Top-level configuration loaded from .squasher.toml.
/// All fields are optional; the OAuth client pair is only required by `serve`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub oauth: OAuthConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub squash: SquashConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Personal token for the `squash` subcommand. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// Host serving pull request pages
    pub web_host: String,
    /// REST API base URL
    pub api_url: String,
    /// Upper bound for each API request
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            web_host: "github.com".to_string(),
            api_url: "https://api.github.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: String,
    /// Absolute callback URL registered with the OAuth app.
    /// If None, derived from the request's Host header.
    pub redirect_url: Option<String>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            scope: "repo,user".to_string(),
            redirect_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Seconds a browser session lives after login starts
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            session_ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SquashConfig {
    pub committer_name: String,
    pub committer_email: String,
}

impl Default for SquashConfig {
    fn default() -> Self {
        Self {
            committer_name: "Squasher bot".to_string(),
            committer_email: "squasher-bot@users.noreply.github.com".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from .squasher.toml in the current
    /// directory when no path is given. A missing default file yields the
    /// default config; an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_from(path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset secrets from the environment. Values in the file win.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.github.token.is_none() {
            self.github.token = var("GITHUB_TOKEN");
        }
        if self.oauth.client_id.is_none() {
            self.oauth.client_id = var("SQUASHER_CLIENT_ID");
        }
        if self.oauth.client_secret.is_none() {
            self.oauth.client_secret = var("SQUASHER_CLIENT_SECRET");
        }
    }

    /// Resolve the GitHub token for terminal use.
    pub fn github_token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    /// The OAuth client id/secret pair, both required for the web service.
    pub fn oauth_client(&self) -> Result<(&str, &str), ConfigError> {
        match (&self.oauth.client_id, &self.oauth.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Ok((id.as_str(), secret.as_str()))
            }
            _ => Err(ConfigError::MissingOAuthClient),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.server.session_ttl_secs)
    }

    pub fn squash_settings(&self) -> SquashSettings {
        SquashSettings {
            web_host: self.github.web_host.clone(),
            committer: Committer {
                name: self.squash.committer_name.clone(),
                email: self.squash.committer_email.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.web_host, "github.com");
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.oauth.scope, "repo,user");
        assert_eq!(config.squash.committer_name, "Squasher bot");
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[github]
web_host = "git.example.com"
api_url = "https://git.example.com/api/v3"
timeout_secs = 5

[oauth]
client_id = "Iv1.abc"
client_secret = "shh"

[squash]
committer_name = "Release bot"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.github.web_host, "git.example.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.oauth_client().unwrap(), ("Iv1.abc", "shh"));
        // Unset fields inside a present section keep their defaults
        assert_eq!(config.oauth.token_url, "https://github.com/login/oauth/access_token");
        assert_eq!(config.squash.committer_name, "Release bot");
        assert_eq!(
            config.squash.committer_email,
            "squasher-bot@users.noreply.github.com"
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"0.0.0.0:8080\"").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.session_ttl(), Duration::from_secs(86400));
    }

    #[test]
    fn test_session_ttl_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nsession_ttl_secs = 600").unwrap();
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.session_ttl(), Duration::from_secs(600));
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_load_from_invalid_toml_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[github\nweb_host = ").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_fills_only_missing_values() {
        let mut config: Config = toml::from_str("[oauth]\nclient_id = \"from-file\"").unwrap();
        config.apply_env(|key| Some(format!("env-{key}")));
        assert_eq!(config.oauth.client_id.as_deref(), Some("from-file"));
        assert_eq!(
            config.oauth.client_secret.as_deref(),
            Some("env-SQUASHER_CLIENT_SECRET")
        );
        assert_eq!(config.github_token().unwrap(), "env-GITHUB_TOKEN");
    }

    #[test]
    fn test_missing_secrets_are_reported() {
        let config = Config::default();
        assert!(matches!(config.github_token(), Err(ConfigError::MissingToken)));
        assert!(matches!(
            config.oauth_client(),
            Err(ConfigError::MissingOAuthClient)
        ));
    }

    #[test]
    fn test_squash_settings_from_config() {
        let settings = Config::default().squash_settings();
        assert_eq!(settings.web_host, "github.com");
        assert_eq!(settings.committer.name, "Squasher bot");
    }
}
