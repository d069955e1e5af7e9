//! Client for the identity provider's OAuth 2.0 endpoints.
//!
//! Both grants (authorization code and refresh token) go through the same
//! form-encoded token endpoint. The userinfo call is here as well because
//! it is what turns a fresh access token into a subject id.

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{header, Client};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::CoreError;
use crate::config::Config;
use crate::models::UserInfo;

/// Length of the random `state` parameter in authorization URLs
const STATE_LENGTH: usize = 32;

#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Providers may omit this on refresh when the refresh token is reused.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime of `access_token` in seconds.
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Identity provider endpoints. Clone is cheap, the HTTP client is shared.
#[derive(Clone)]
pub struct TokenEndpoint {
    client: Client,
    oauth_base_url: String,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: String,
}

impl TokenEndpoint {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            oauth_base_url: config.oauth_base_url.clone(),
            api_base_url: config.api_base_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        }
    }

    /// Random value for the `state` parameter of an authorization request.
    pub fn generate_state() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LENGTH)
            .map(char::from)
            .collect()
    }

    /// URL the operator opens in a browser to grant access.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}/authorization?response_type=code&client_id={}&redirect_uri={}&state={}&scope={}",
            self.oauth_base_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(&self.scopes),
        )
    }

    fn token_url(&self) -> String {
        format!("{}/accessToken", self.oauth_base_url)
    }

    /// Exchange an authorization code for the first token pair.
    pub async fn exchange_code(&self, code: &str, redirect_uri: Option<&str>) -> Result<TokenResponse, CoreError> {
        let redirect_uri = redirect_uri.unwrap_or(&self.redirect_uri);
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .client
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| CoreError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Authorization code exchange rejected");
            return Err(CoreError::from_status(status, body));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| CoreError::InvalidResponse(format!("token response: {}", e)))?;
        debug!(?tokens, "Authorization code exchanged");
        Ok(tokens)
    }

    /// Mint a new access token from a refresh token.
    ///
    /// Every failure mode maps to `TokenRefreshFailed`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, CoreError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| CoreError::TokenRefreshFailed {
                cause: format!("token endpoint unreachable: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::TokenRefreshFailed {
                cause: format!("token endpoint returned {}: {}", status, body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| CoreError::TokenRefreshFailed {
                cause: format!("unreadable token response: {}", e),
            })
    }

    /// OpenID userinfo for an access token; `sub` is the subject id.
    pub async fn user_info(&self, access_token: &str) -> Result<UserInfo, CoreError> {
        let response = self
            .client
            .get(format!("{}/userinfo", self.api_base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| CoreError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::from_status(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| CoreError::InvalidResponse(format!("userinfo response: {}", e)))
    }
}
