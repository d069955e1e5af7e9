use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credentials::{CredentialRecord, CredentialStore};
use super::oauth::{TokenEndpoint, TokenResponse};
use crate::api::{CoreError, Urn};

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// What `ensure_fresh` did to the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    AlreadyFresh,
    Refreshed,
    /// Refreshed in memory, but the credential file could not be written.
    RefreshedNotPersisted(String),
}

/// Snapshot of the identity a single request is built for.
#[derive(Clone)]
pub struct RequestContext {
    pub subject_id: String,
    pub access_token: String,
}

impl RequestContext {
    /// The authorized member as an `author`/`actor` reference.
    pub fn author(&self) -> Urn {
        Urn::person(&self.subject_id)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("subject_id", &self.subject_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RefreshSlot {
    last_outcome: Option<Result<RefreshOutcome, CoreError>>,
}

/// Owns the credential lifecycle: freshness checks, the refresh
/// transaction, and installing newly authorized credentials.
///
/// Refreshes are single-flight. Callers that find the credential expired
/// queue on `refresh_slot`; whoever gets there first performs the refresh
/// and bumps `refresh_epoch`, and everyone who was already waiting returns
/// that outcome instead of spending the refresh token a second time.
pub struct SessionManager {
    store: CredentialStore,
    endpoint: TokenEndpoint,
    clock: Arc<dyn Clock>,
    refresh_slot: Mutex<RefreshSlot>,
    refresh_epoch: AtomicU64,
}

impl SessionManager {
    pub fn new(store: CredentialStore, endpoint: TokenEndpoint) -> Self {
        Self::with_clock(store, endpoint, Arc::new(SystemClock))
    }

    pub fn with_clock(store: CredentialStore, endpoint: TokenEndpoint, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            endpoint,
            clock,
            refresh_slot: Mutex::new(RefreshSlot::default()),
            refresh_epoch: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn endpoint(&self) -> &TokenEndpoint {
        &self.endpoint
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// A credential is on record. Says nothing about freshness.
    pub fn is_authenticated(&self) -> bool {
        self.store.current().is_some()
    }

    pub fn access_context(&self) -> Option<RequestContext> {
        self.store.current().map(|record| RequestContext {
            subject_id: record.subject_id,
            access_token: record.access_token,
        })
    }

    /// Refresh the credential if it has expired (`expires_at <= now`).
    pub async fn ensure_fresh(&self) -> Result<RefreshOutcome, CoreError> {
        let seen = self.refresh_epoch.load(Ordering::Acquire);
        let record = self.store.current().ok_or(CoreError::AuthenticationRequired)?;
        if !record.is_expired_at(self.now_millis()) {
            return Ok(RefreshOutcome::AlreadyFresh);
        }

        debug!(subject = %record.subject_id, "Access token expired, refreshing");
        self.refresh_single_flight(seen, |record, now| record.is_expired_at(now))
            .await
    }

    /// Force a refresh after the resource API rejected `rejected_access_token`.
    ///
    /// No-op when the stored token has already moved on.
    pub async fn refresh_after_rejection(&self, rejected_access_token: &str) -> Result<RefreshOutcome, CoreError> {
        let seen = self.refresh_epoch.load(Ordering::Acquire);
        self.refresh_single_flight(seen, |record, _| record.access_token == rejected_access_token)
            .await
    }

    async fn refresh_single_flight<F>(&self, seen: u64, still_needed: F) -> Result<RefreshOutcome, CoreError>
    where
        F: Fn(&CredentialRecord, i64) -> bool,
    {
        let mut slot = self.refresh_slot.lock().await;

        if self.refresh_epoch.load(Ordering::Acquire) != seen {
            debug!("Joined outcome of concurrent refresh");
            return slot
                .last_outcome
                .clone()
                .unwrap_or(Ok(RefreshOutcome::AlreadyFresh));
        }

        let record = self.store.current().ok_or(CoreError::AuthenticationRequired)?;
        if !still_needed(&record, self.now_millis()) {
            return Ok(RefreshOutcome::AlreadyFresh);
        }

        let outcome = self.run_refresh(&record).await;
        slot.last_outcome = Some(outcome.clone());
        self.refresh_epoch.fetch_add(1, Ordering::Release);
        outcome
    }

    /// One round trip to the token endpoint, then replace and persist.
    /// On any failure the stored record is left exactly as it was.
    async fn run_refresh(&self, record: &CredentialRecord) -> Result<RefreshOutcome, CoreError> {
        info!(subject = %record.subject_id, "Refreshing access token");

        let tokens = match self.endpoint.refresh(&record.refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(subject = %record.subject_id, error = %e, "Token refresh failed");
                return Err(e);
            }
        };
        if tokens.access_token.is_empty() {
            return Err(CoreError::TokenRefreshFailed {
                cause: "token endpoint returned an empty access token".to_string(),
            });
        }

        let expires_at = self
            .expiry_from(&tokens)
            .max(record.expires_at_epoch_millis);
        let refreshed = CredentialRecord {
            subject_id: record.subject_id.clone(),
            access_token: tokens.access_token,
            refresh_token: tokens
                .refresh_token
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| record.refresh_token.clone()),
            expires_at_epoch_millis: expires_at,
        };

        match self.store.save(refreshed) {
            Ok(()) => {
                info!(subject = %record.subject_id, expires_at, "Refreshed access token");
                Ok(RefreshOutcome::Refreshed)
            }
            Err(CoreError::Persistence(reason)) => Ok(RefreshOutcome::RefreshedNotPersisted(reason)),
            Err(other) => Err(other),
        }
    }

    fn expiry_from(&self, tokens: &TokenResponse) -> i64 {
        self.now_millis()
            .saturating_add(tokens.expires_in.saturating_mul(1000))
    }

    /// Finish the browser authorization flow: exchange the code, resolve
    /// the subject through userinfo, and install the credential.
    pub async fn complete_authorization(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<CredentialRecord, CoreError> {
        let tokens = self.endpoint.exchange_code(code, redirect_uri).await?;
        let user = self.endpoint.user_info(&tokens.access_token).await?;
        self.install(&user.sub, tokens).await
    }

    /// Install a credential for `subject_id` from a raw token response.
    ///
    /// A persistence failure is returned, but the credential is already
    /// active in memory.
    pub async fn install(&self, subject_id: &str, tokens: TokenResponse) -> Result<CredentialRecord, CoreError> {
        if subject_id.is_empty() {
            return Err(CoreError::InvalidInput("subject id is empty".to_string()));
        }
        let refresh_token = tokens
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CoreError::InvalidResponse("token response carried no refresh_token".to_string()))?;

        // Serialize with any in-flight refresh so it cannot overwrite this record.
        let _slot = self.refresh_slot.lock().await;

        if let Some(previous) = self.store.current() {
            if previous.subject_id != subject_id {
                info!(previous = %previous.subject_id, subject = %subject_id, "Replacing credential for a different account");
            }
        }

        let record = CredentialRecord {
            subject_id: subject_id.to_string(),
            access_token: tokens.access_token.clone(),
            refresh_token,
            expires_at_epoch_millis: self.expiry_from(&tokens),
        };
        info!(subject = %subject_id, "Stored credential for {}", Urn::person(subject_id));
        self.store.save(record.clone())?;
        Ok(record)
    }
}
