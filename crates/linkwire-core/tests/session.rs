mod common;

use std::time::Duration;

use common::*;
use linkwire_core::auth::{RefreshOutcome, TokenResponse};
use linkwire_core::{CoreError, CredentialStore};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_credential_expiring_now_is_refreshed() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW)));
    refresh_succeeds(3600).expect(1).mount(&server).await;

    let outcome = linkwire.session().ensure_fresh().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);

    let current = linkwire.session().store().current().unwrap();
    assert_eq!(current.subject_id, "42");
    assert_eq!(current.access_token, "access-2");
    assert_eq!(current.refresh_token, "refresh-2");
    assert_eq!(current.expires_at_epoch_millis, NOW + 3_600_000);

    let on_disk = read_file(dir.path());
    assert_eq!(on_disk["userId"], "42");
    assert_eq!(on_disk["accessToken"], "access-2");
    assert_eq!(on_disk["refreshToken"], "refresh-2");
    assert_eq!(on_disk["expiresAt"], NOW + 3_600_000);
}

#[tokio::test]
async fn test_unexpired_credential_is_left_alone() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW + 1)));
    refresh_succeeds(3600).expect(0).mount(&server).await;

    let outcome = linkwire.session().ensure_fresh().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::AlreadyFresh);
    assert_eq!(linkwire.session().store().current(), Some(record(NOW + 1)));
}

#[tokio::test]
async fn test_rejected_refresh_preserves_record() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW - 1)));
    refresh_rejected().expect(1).mount(&server).await;
    let before = std::fs::read(token_file(dir.path())).unwrap();

    let err = linkwire.session().ensure_fresh().await.unwrap_err();
    match err {
        CoreError::TokenRefreshFailed { cause } => assert!(cause.contains("invalid_grant")),
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(linkwire.session().store().current(), Some(record(NOW - 1)));
    assert_eq!(std::fs::read(token_file(dir.path())).unwrap(), before);
}

#[tokio::test]
async fn test_refresh_timeout_preserves_record() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack_with(&server, dir.path(), Some(record(NOW - 1)), |config| {
        config.request_timeout = Duration::from_millis(100);
    });
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "access-2",
                    "refresh_token": "refresh-2",
                    "expires_in": 3600,
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let before = std::fs::read(token_file(dir.path())).unwrap();

    let err = linkwire.session().ensure_fresh().await.unwrap_err();
    assert!(matches!(err, CoreError::TokenRefreshFailed { .. }));

    assert_eq!(linkwire.session().store().current(), Some(record(NOW - 1)));
    assert_eq!(std::fs::read(token_file(dir.path())).unwrap(), before);
    assert!(!dir.path().join("tokenStore.json.tmp").exists());
}

#[tokio::test]
async fn test_failed_refresh_is_retried_on_next_call() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW - 1)));
    refresh_rejected().expect(2).mount(&server).await;

    assert!(linkwire.session().ensure_fresh().await.is_err());
    assert!(linkwire.session().ensure_fresh().await.is_err());
    assert!(linkwire.session().is_authenticated());
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW - 1)));
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "access-2",
                    "refresh_token": "refresh-2",
                    "expires_in": 3600,
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = linkwire.session();
    let (first, second) = tokio::join!(session.ensure_fresh(), session.ensure_fresh());
    assert_eq!(first.unwrap(), RefreshOutcome::Refreshed);
    assert_eq!(second.unwrap(), RefreshOutcome::Refreshed);
    assert_eq!(session.store().current().unwrap().access_token, "access-2");
}

#[tokio::test]
async fn test_concurrent_callers_share_refresh_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW - 1)));
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let session = linkwire.session();
    let results = futures::future::join_all((0..4).map(|_| session.ensure_fresh())).await;
    for result in results {
        assert!(matches!(result, Err(CoreError::TokenRefreshFailed { .. })));
    }
}

#[tokio::test]
async fn test_refresh_without_new_refresh_token_keeps_old_one() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW - 1)));
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "expires_in": 60,
        })))
        .expect(1)
        .mount(&server)
        .await;

    linkwire.session().ensure_fresh().await.unwrap();
    let current = linkwire.session().store().current().unwrap();
    assert_eq!(current.access_token, "access-2");
    assert_eq!(current.refresh_token, "refresh-1");
    assert_eq!(current.expires_at_epoch_millis, NOW + 60_000);
}

#[tokio::test]
async fn test_forced_refresh_never_moves_expiry_backwards() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW + 10_000)));
    refresh_succeeds(1).expect(1).mount(&server).await;

    let outcome = linkwire.session().refresh_after_rejection("access-1").await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);
    let current = linkwire.session().store().current().unwrap();
    assert_eq!(current.access_token, "access-2");
    assert_eq!(current.expires_at_epoch_millis, NOW + 10_000);
}

#[tokio::test]
async fn test_forced_refresh_skips_token_already_replaced() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), Some(record(NOW + 10_000)));
    refresh_succeeds(3600).expect(0).mount(&server).await;

    let outcome = linkwire.session().refresh_after_rejection("some-older-token").await.unwrap();
    assert_eq!(outcome, RefreshOutcome::AlreadyFresh);
}

#[tokio::test]
async fn test_unauthenticated_session_makes_no_requests() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), None);

    assert!(!linkwire.session().is_authenticated());
    let err = linkwire.session().ensure_fresh().await.unwrap_err();
    assert_eq!(err, CoreError::AuthenticationRequired);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_refresh_survives_unwritable_credential_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the credential directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let (linkwire, _clock) = stack(&server, &blocker, None);
    assert!(matches!(
        linkwire.session().store().save(record(NOW - 1)),
        Err(CoreError::Persistence(_))
    ));
    refresh_succeeds(3600).expect(1).mount(&server).await;

    let outcome = linkwire.session().ensure_fresh().await.unwrap();
    assert!(matches!(outcome, RefreshOutcome::RefreshedNotPersisted(_)));
    assert_eq!(linkwire.session().store().current().unwrap().access_token, "access-2");
}

#[tokio::test]
async fn test_complete_authorization_stamps_subject() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), None);
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Flinkedin%2Fcallback"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-new",
            "refresh_token": "refresh-new",
            "expires_in": 5_184_000,
            "scope": "openid,profile,w_member_social",
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/userinfo"))
        .and(header("Authorization", "Bearer access-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "42",
            "name": "Ada Lovelace",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = linkwire
        .session()
        .complete_authorization("auth-code-1", None)
        .await
        .unwrap();
    assert_eq!(record.subject_id, "42");
    assert_eq!(record.expires_at_epoch_millis, NOW + 5_184_000_000);
    assert!(linkwire.session().is_authenticated());

    let reloaded = CredentialStore::new(token_file(dir.path())).load().unwrap();
    assert_eq!(reloaded, record);
}

#[tokio::test]
async fn test_rejected_code_exchange_is_upstream_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), None);
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_request"))
        .expect(1)
        .mount(&server)
        .await;

    let err = linkwire
        .session()
        .complete_authorization("stale-code", None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CoreError::UpstreamRequestFailed {
            status: 400,
            body: "invalid_request".into()
        }
    );
    assert!(!linkwire.session().is_authenticated());
}

#[tokio::test]
async fn test_install_requires_refresh_token() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, _clock) = stack(&server, dir.path(), None);
    let tokens: TokenResponse =
        serde_json::from_value(json!({ "access_token": "a", "expires_in": 60 })).unwrap();

    let err = linkwire.session().install("42", tokens).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidResponse(_)));
    assert!(!linkwire.session().is_authenticated());
}

#[tokio::test]
async fn test_clock_advancing_past_expiry_triggers_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (linkwire, clock) = stack(&server, dir.path(), Some(record(NOW + 1_000)));
    refresh_succeeds(3600).expect(1).mount(&server).await;

    assert_eq!(linkwire.session().ensure_fresh().await.unwrap(), RefreshOutcome::AlreadyFresh);
    clock.set(NOW + 1_000);
    assert_eq!(linkwire.session().ensure_fresh().await.unwrap(), RefreshOutcome::Refreshed);
    assert_eq!(
        linkwire.session().store().current().unwrap().expires_at_epoch_millis,
        NOW + 1_000 + 3_600_000
    );
}
