//! linkwire-core: act as one authorized LinkedIn member.
//!
//! The crate is layered leaf-first:
//!
//! 1. [`auth::CredentialStore`] holds the single credential record and its
//!    file mirror.
//! 2. [`auth::SessionManager`] decides when that credential has expired and
//!    refreshes it, one refresh at a time.
//! 3. [`api::RequestDispatcher`] is the only path to the REST API; it makes
//!    sure the credential is fresh before a request is built.
//!
//! [`api::LinkedInClient`] shapes the individual operations on top, and
//! [`Linkwire`] wires all of it from a [`Config`].

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;

pub use api::{CoreError, LinkedInClient, RequestDispatcher, Urn};
pub use auth::{CredentialRecord, CredentialStore, SessionManager, TokenEndpoint};
pub use config::Config;

/// The assembled stack: one session, one dispatcher, one client.
pub struct Linkwire {
    config: Config,
    session: Arc<SessionManager>,
    client: LinkedInClient,
}

impl Linkwire {
    /// Build the stack and restore any stored credential.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(auth::SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn auth::Clock>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let store = CredentialStore::new(config.token_file.clone());
        store.load();

        let endpoint = TokenEndpoint::new(http.clone(), &config);
        let session = Arc::new(SessionManager::with_clock(store, endpoint, clock));
        let dispatcher = RequestDispatcher::new(
            session.clone(),
            http,
            config.api_base_url.clone(),
            config.request_timeout,
        );

        Ok(Self {
            config,
            session,
            client: LinkedInClient::new(dispatcher),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn client(&self) -> &LinkedInClient {
        &self.client
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        self.client.dispatcher()
    }
}
