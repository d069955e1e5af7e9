//! Authentication module for the single delegated LinkedIn credential.
//!
//! This module provides:
//! - `CredentialStore`: the credential record, mirrored to a JSON file
//! - `SessionManager`: expiry checks and single-flight token refresh
//! - `TokenEndpoint`: the identity provider's OAuth endpoints
//! - `ClientSecretStore`: OS keychain storage for the OAuth client secret

pub mod credentials;
pub mod keychain;
pub mod oauth;
pub mod session;

pub use credentials::{CredentialRecord, CredentialStore, CREDENTIAL_FILE};
pub use keychain::ClientSecretStore;
pub use oauth::{TokenEndpoint, TokenResponse};
pub use session::{Clock, RefreshOutcome, RequestContext, SessionManager, SystemClock};
