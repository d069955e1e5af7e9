//! Application configuration.
//!
//! Values come from the environment (the binary loads a `.env` file first).
//! The client secret may instead live in the OS keychain, see
//! [`crate::auth::ClientSecretStore`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::auth::{ClientSecretStore, CREDENTIAL_FILE};

/// Application name used for the config directory path
const APP_NAME: &str = "linkwire";

pub const DEFAULT_API_BASE_URL: &str = "https://api.linkedin.com/v2";
pub const DEFAULT_OAUTH_BASE_URL: &str = "https://www.linkedin.com/oauth/v2";
const DEFAULT_AUTH_PORT: u16 = 8000;
const DEFAULT_SCOPES: &str = "openid profile email w_member_social";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Port of the browser authorization endpoint, used in reauthorization guidance.
    pub auth_port: u16,
    pub token_file: PathBuf,
    pub api_base_url: String,
    pub oauth_base_url: String,
    pub request_timeout: Duration,
    pub scopes: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_port", &self.auth_port)
            .field("token_file", &self.token_file)
            .field("api_base_url", &self.api_base_url)
            .field("oauth_base_url", &self.oauth_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl Config {
    /// Config with defaults for everything but the OAuth client triple.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_port: DEFAULT_AUTH_PORT,
            token_file: PathBuf::from(CREDENTIAL_FILE),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_OAUTH_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), |client_id| ClientSecretStore::get(client_id).ok())
    }

    /// Build from an arbitrary variable source; `keychain` is consulted only
    /// when `LINKEDIN_CLIENT_SECRET` is unset.
    pub fn from_lookup<F, K>(lookup: F, keychain: K) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        K: FnOnce(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| anyhow!("Missing required environment variable {}", key));

        let client_id = required("LINKEDIN_CLIENT_ID")?;
        let redirect_uri = required("LINKEDIN_REDIRECT_URI")?;
        let client_secret = match var("LINKEDIN_CLIENT_SECRET") {
            Some(secret) => secret,
            None => {
                debug!("LINKEDIN_CLIENT_SECRET unset, trying keychain");
                keychain(&client_id).ok_or_else(|| {
                    anyhow!("Missing required environment variable LINKEDIN_CLIENT_SECRET (and no secret in keychain)")
                })?
            }
        };

        let mut config = Self::new(client_id, client_secret, redirect_uri);

        if let Some(port) = var("AUTH_PORT") {
            config.auth_port = port.parse().with_context(|| format!("Invalid AUTH_PORT: {}", port))?;
        }
        config.token_file = match var("LINKWIRE_TOKEN_FILE") {
            Some(path) => PathBuf::from(path),
            None => Self::default_token_file()?,
        };
        if let Some(url) = var("LINKWIRE_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = var("LINKWIRE_OAUTH_BASE_URL") {
            config.oauth_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = var("LINKWIRE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("Invalid LINKWIRE_REQUEST_TIMEOUT_SECS: {}", secs))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(scopes) = var("LINKWIRE_SCOPES") {
            config.scopes = scopes;
        }

        Ok(config)
    }

    fn default_token_file() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CREDENTIAL_FILE))
    }

    /// Where the operator goes to authorize (or reauthorize) the account.
    pub fn reauthorization_url(&self) -> String {
        format!("http://localhost:{}/auth/linkedin", self.auth_port)
    }
}
