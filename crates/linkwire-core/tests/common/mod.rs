// Not every test binary uses every helper
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use linkwire_core::auth::Clock;
use linkwire_core::{Config, CredentialRecord, CredentialStore, Linkwire};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fixed "now" for every test: 2025-06-15T15:06:40Z
pub const NOW: i64 = 1_750_000_000_000;

pub const TOKEN_PATH: &str = "/oauth/v2/accessToken";

pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn at(millis: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(millis)))
    }

    pub fn set(&self, millis: i64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn config(server: &MockServer, token_file: PathBuf) -> Config {
    let mut config = Config::new("cid", "csecret", "http://localhost:8000/auth/linkedin/callback");
    config.token_file = token_file;
    config.api_base_url = format!("{}/v2", server.uri());
    config.oauth_base_url = format!("{}/oauth/v2", server.uri());
    config.request_timeout = Duration::from_secs(5);
    config
}

pub fn record(expires_at: i64) -> CredentialRecord {
    CredentialRecord {
        subject_id: "42".into(),
        access_token: "access-1".into(),
        refresh_token: "refresh-1".into(),
        expires_at_epoch_millis: expires_at,
    }
}

pub fn token_file(dir: &Path) -> PathBuf {
    dir.join("tokenStore.json")
}

/// Stack whose credential file starts out holding `seed` (if any).
pub fn stack(server: &MockServer, dir: &Path, seed: Option<CredentialRecord>) -> (Linkwire, Arc<FixedClock>) {
    stack_with(server, dir, seed, |_| {})
}

/// Like [`stack`], with a chance to adjust the config first.
pub fn stack_with<F>(
    server: &MockServer,
    dir: &Path,
    seed: Option<CredentialRecord>,
    configure: F,
) -> (Linkwire, Arc<FixedClock>)
where
    F: FnOnce(&mut Config),
{
    let file = token_file(dir);
    if let Some(record) = seed {
        CredentialStore::new(file.clone())
            .save(record)
            .expect("seed credential file");
    }
    let mut config = config(server, file);
    configure(&mut config);
    let clock = FixedClock::at(NOW);
    let linkwire = Linkwire::with_clock(config, clock.clone()).expect("build stack");
    (linkwire, clock)
}

/// Token endpoint answering a refresh of `refresh-1` with `access-2`/`refresh-2`.
pub fn refresh_succeeds(expires_in: i64) -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .and(body_string_contains("client_id=cid"))
        .and(body_string_contains("client_secret=csecret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_in": expires_in,
        })))
}

pub fn refresh_rejected() -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The provided authorization grant is invalid",
        })))
}

pub fn read_file(dir: &Path) -> serde_json::Value {
    let contents = std::fs::read_to_string(token_file(dir)).expect("credential file");
    serde_json::from_str(&contents).expect("credential json")
}
