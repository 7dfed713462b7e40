//! Tests for the authorization gate.

use std::sync::Arc;

use http::header::COOKIE;
use http::{HeaderMap, HeaderValue};

use crate::authz::AuthorizationGate;
use crate::tests::{
    FakeVerifier, authorized_claims, issuer_encoding_key, mint_token, rogue_encoding_key,
    test_config,
};

fn gate_with(verifier: Arc<FakeVerifier>) -> AuthorizationGate {
    AuthorizationGate::new(Arc::new(test_config()), verifier)
}

fn headers_with_token(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        HeaderValue::from_str(&format!("token={token}")).expect("valid header"),
    );
    headers
}

#[tokio::test]
async fn missing_cookie_denies_without_remote_call() {
    let verifier = Arc::new(FakeVerifier::allow());
    let gate = gate_with(verifier.clone());

    let result = gate.authorize(&HeaderMap::new()).await;

    assert!(result.is_err());
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn valid_token_with_valid_order_allows() {
    let verifier = Arc::new(FakeVerifier::allow());
    let gate = gate_with(verifier.clone());

    let claims = authorized_claims();
    let token = mint_token(&claims, &issuer_encoding_key());
    let result = gate.authorize(&headers_with_token(&token)).await;

    let allowed = result.expect("Should allow");
    assert_eq!(allowed, claims);
    assert_eq!(verifier.calls(), 1);
}

#[tokio::test]
async fn mismatched_subject_denies() {
    let verifier = Arc::new(FakeVerifier::allow());
    let gate = gate_with(verifier.clone());

    let mut claims = authorized_claims();
    claims.sub = "somebody-else".to_string();
    let token = mint_token(&claims, &issuer_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn mismatched_realm_denies() {
    let verifier = Arc::new(FakeVerifier::allow());
    let gate = gate_with(verifier.clone());

    let mut claims = authorized_claims();
    claims.realm = "another-realm".to_string();
    let token = mint_token(&claims, &issuer_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn mismatched_audience_denies() {
    let verifier = Arc::new(FakeVerifier::allow());
    let gate = gate_with(verifier.clone());

    let mut claims = authorized_claims();
    claims.aud = "some-other-gateway".to_string();
    let token = mint_token(&claims, &issuer_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn mismatched_client_id_denies() {
    let verifier = Arc::new(FakeVerifier::allow());
    let gate = gate_with(verifier.clone());

    let mut claims = authorized_claims();
    claims.may_act.client_id = "mobile-frontend".to_string();
    let token = mint_token(&claims, &issuer_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn token_from_wrong_key_denies_regardless_of_payload() {
    let verifier = Arc::new(FakeVerifier::allow());
    let gate = gate_with(verifier.clone());

    let claims = authorized_claims();
    let token = mint_token(&claims, &rogue_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 0);
}

#[tokio::test]
async fn remote_server_error_denies() {
    let verifier = Arc::new(FakeVerifier::deny("Internal Server Error", 500));
    let gate = gate_with(verifier.clone());

    let token = mint_token(&authorized_claims(), &issuer_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 1);
}

#[tokio::test]
async fn remote_rejection_denies() {
    let verifier = Arc::new(FakeVerifier::deny("order declined", 403));
    let gate = gate_with(verifier.clone());

    let token = mint_token(&authorized_claims(), &issuer_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 1);
}

#[tokio::test]
async fn remote_transport_error_denies() {
    // Transport failures are synthesized as status 500 by the client.
    let verifier = Arc::new(FakeVerifier::deny("connection refused", 500));
    let gate = gate_with(verifier.clone());

    let token = mint_token(&authorized_claims(), &issuer_encoding_key());

    assert!(gate.authorize(&headers_with_token(&token)).await.is_err());
    assert_eq!(verifier.calls(), 1);
}
