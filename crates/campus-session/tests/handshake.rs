#![allow(clippy::unwrap_used, clippy::panic)] // Integration tests use unwrap for brevity

//! Handshake against an in-process mock server.

mod common;

use std::time::{Duration, Instant};

use campus_crypto::SessionKeyDerivation;
use campus_session::{
    ErrorKind, Handshake, HandshakePhase, HttpTransport, SessionError, TransportSecurity,
};
use common::{API_VERSION, HandshakeMode, MockServer, MockState, new_context};
use url::Url;

#[tokio::test]
async fn secure_transport_receives_grant_in_clear() {
    let server = MockServer::spawn(MockState::direct(false)).await;
    let transport = server.transport(TransportSecurity::Secure);
    let ctx = new_context();

    let mut hs = Handshake::new(&transport, &ctx);
    let session = hs.run().await.unwrap();

    assert_eq!(hs.phase(), &HandshakePhase::Established);
    assert_eq!(session.session_id(), "s-1");
    assert_eq!(session.api_version(), API_VERSION);
    assert!(session.credential().is_none());

    let state = ctx.state().await;
    assert!(state.established);
    assert_eq!(state.session_key, server.state.session_key);

    assert_eq!(server.last_handshake_body().unwrap(), serde_json::json!({}));
}

#[tokio::test]
async fn insecure_transport_sends_public_key_and_decrypts_grant() {
    let server = MockServer::spawn(MockState::direct(true)).await;
    let transport = server.transport(TransportSecurity::Insecure);
    let ctx = new_context();

    let session = Handshake::new(&transport, &ctx).run().await.unwrap();
    assert_eq!(session.session_id(), "s-1");
    assert_eq!(session.credential(), Some(&server.state.credential));

    let body = server.last_handshake_body().unwrap();
    let key = body["userPublicKey"].as_str().unwrap();
    assert!(!key.is_empty());
}

#[tokio::test]
async fn each_attempt_uses_a_fresh_key_pair() {
    let server = MockServer::spawn(MockState::direct(true)).await;
    let transport = server.transport(TransportSecurity::Insecure);
    let ctx = new_context();

    Handshake::new(&transport, &ctx).run().await.unwrap();
    let first = server.last_handshake_body().unwrap()["userPublicKey"].clone();
    Handshake::new(&transport, &ctx).run().await.unwrap();
    let second = server.last_handshake_body().unwrap()["userPublicKey"].clone();

    assert_ne!(first, second);
    assert_eq!(server.handshake_count(), 2);
    assert_eq!(ctx.current().await.unwrap().session_id(), "s-2");
}

#[tokio::test]
async fn corrupted_grant_fails_with_crypto_reason() {
    let server = MockServer::spawn(
        MockState::direct(true).with_handshake(HandshakeMode::CorruptCiphertext),
    )
    .await;
    let transport = server.transport(TransportSecurity::Insecure);
    let ctx = new_context();

    let mut hs = Handshake::new(&transport, &ctx);
    let err = hs.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Crypto);
    assert!(matches!(
        hs.phase(),
        HandshakePhase::Failed {
            kind: ErrorKind::Crypto,
            ..
        }
    ));
    assert!(!ctx.is_established().await);
}

#[tokio::test]
async fn server_rejection_is_api_failure() {
    let server = MockServer::spawn(
        MockState::direct(false).with_handshake(HandshakeMode::Reject("maintenance")),
    )
    .await;
    let transport = server.transport(TransportSecurity::Secure);
    let ctx = new_context();

    let err = Handshake::new(&transport, &ctx).run().await.unwrap_err();
    match err {
        SessionError::Api { message } => assert_eq!(message, "maintenance"),
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(!ctx.is_established().await);
}

#[tokio::test]
async fn missing_api_version_defaults_to_empty() {
    let server = MockServer::spawn(
        MockState::direct(false).with_handshake(HandshakeMode::MissingApiVersion),
    )
    .await;
    let transport = server.transport(TransportSecurity::Secure);
    let ctx = new_context();

    let session = Handshake::new(&transport, &ctx).run().await.unwrap();
    assert_eq!(session.session_id(), "s-1");
    assert_eq!(session.api_version(), "");
    assert!(ctx.is_established().await);
}

#[tokio::test]
async fn secure_transport_accepts_any_session_key() {
    let state = MockState::new(
        "deadbeef".to_string(),
        campus_crypto::SymmetricCredential::generate(),
        false,
    );
    let server = MockServer::spawn(state).await;
    let transport = server.transport(TransportSecurity::Secure);
    let ctx = new_context();

    let mut hs = Handshake::new(&transport, &ctx);
    let session = hs.run().await.unwrap();

    assert_eq!(hs.phase(), &HandshakePhase::Established);
    assert!(session.credential().is_none());
    assert_eq!(session.session_key(), "deadbeef");
    assert_eq!(ctx.state().await.session_key, "deadbeef");
}

#[tokio::test]
async fn malformed_direct_key_is_protocol_failure_when_insecure() {
    let state = MockState::new(
        "not-a-hex-credential".to_string(),
        campus_crypto::SymmetricCredential::generate(),
        true,
    );
    let server = MockServer::spawn(state).await;
    let transport = server.transport(TransportSecurity::Insecure);
    let ctx = new_context();

    let mut hs = Handshake::new(&transport, &ctx);
    let err = hs.run().await.unwrap_err();
    assert!(matches!(err, SessionError::Protocol(_)));
    assert!(!ctx.is_established().await);
}

#[tokio::test]
async fn hkdf_derivation_accepts_opaque_keys() {
    let server = MockServer::spawn(MockState::hkdf(true)).await;
    let transport = server.transport(TransportSecurity::Insecure);
    let ctx = new_context();

    let session = Handshake::new(&transport, &ctx)
        .with_key_derivation(SessionKeyDerivation::Hkdf)
        .run()
        .await
        .unwrap();
    assert_eq!(session.credential(), Some(&server.state.credential));
}

#[tokio::test]
async fn unreachable_server_fails_quickly() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let transport = HttpTransport::new(url).unwrap();
    let ctx = new_context();

    let mut hs = Handshake::new(&transport, &ctx).with_timeout(Duration::from_secs(2));
    let err = hs.run().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(matches!(
        hs.phase(),
        HandshakePhase::Failed {
            kind: ErrorKind::Transport,
            ..
        }
    ));
    assert!(!ctx.is_established().await);
}

#[tokio::test]
async fn silent_server_times_out_within_bound() {
    // Accepts connections into the backlog but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
    let transport = HttpTransport::new(url).unwrap();
    let ctx = new_context();

    let timeout = Duration::from_millis(500);
    let mut hs = Handshake::new(&transport, &ctx).with_timeout(timeout);
    let started = Instant::now();
    let err = hs.run().await.unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {err:?}");
    assert!(matches!(hs.phase(), HandshakePhase::Failed { .. }));
    // Key generation happens before the timed exchange.
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!ctx.is_established().await);
    drop(listener);
}

#[tokio::test]
async fn failed_rehandshake_keeps_previous_session() {
    let server = MockServer::spawn(MockState::direct(false)).await;
    let transport = server.transport(TransportSecurity::Secure);
    let ctx = new_context();
    Handshake::new(&transport, &ctx).run().await.unwrap();

    let dead = HttpTransport::new(Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
    let result = Handshake::new(&dead, &ctx)
        .with_timeout(Duration::from_secs(2))
        .run()
        .await;
    assert!(result.is_err());

    assert_eq!(ctx.current().await.unwrap().session_id(), "s-1");
}
