//! Shared fixtures and fakes for the unit test suite.

mod authz_tests;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use jsonwebtoken::EncodingKey;

use crate::config::{GatewayConfig, Identity};
use crate::store::{MultipartUploadHandle, ObjectStore, StoreError, StoredObject, UploadedPart};
use crate::token::{Claims, OrderMetadata, OrderStatus};
use crate::verifier::{OrderVerification, VerificationOutcome};

pub(crate) fn authorized_identity() -> Identity {
    Identity {
        subject: "order-service".to_string(),
        realm: "songs".to_string(),
        audience: "object-gateway".to_string(),
        client_id: "web-frontend".to_string(),
    }
}

pub(crate) fn service_identity() -> Identity {
    Identity {
        subject: "ordergate".to_string(),
        realm: "songs".to_string(),
        audience: "order-verifier".to_string(),
        client_id: "ordergate".to_string(),
    }
}

/// Config wired to the PEM fixtures under `test_config/keys/`: inbound
/// tokens verify against the issuer key pair, outbound tokens sign with the
/// gateway key pair.
pub(crate) fn test_config() -> GatewayConfig {
    let verification_pem = std::fs::read("test_config/keys/issuer.pub.pem")
        .expect("Failed to read issuer public key");
    let signing_pem =
        std::fs::read("test_config/keys/gateway.pem").expect("Failed to read gateway private key");

    GatewayConfig {
        authorized_identity: authorized_identity(),
        service_identity: service_identity(),
        cookie_name: "token".to_string(),
        verifier_base_url: "http://127.0.0.1:1".to_string(),
        verifier_api_version: "v1".to_string(),
        verification_key: jsonwebtoken::DecodingKey::from_rsa_pem(&verification_pem)
            .expect("Failed to parse issuer public key"),
        signing_key: EncodingKey::from_rsa_pem(&signing_pem)
            .expect("Failed to parse gateway private key"),
    }
}

pub(crate) fn issuer_encoding_key() -> EncodingKey {
    let pem =
        std::fs::read("test_config/keys/issuer.pem").expect("Failed to read issuer private key");
    EncodingKey::from_rsa_pem(&pem).expect("Failed to parse issuer private key")
}

pub(crate) fn rogue_encoding_key() -> EncodingKey {
    let pem =
        std::fs::read("test_config/keys/rogue.pem").expect("Failed to read rogue private key");
    EncodingKey::from_rsa_pem(&pem).expect("Failed to parse rogue private key")
}

pub(crate) fn test_order() -> OrderMetadata {
    OrderMetadata {
        order_id: "ord-7781".to_string(),
        order_cart_id: "cart-20".to_string(),
        order_song_ids: vec!["song-1".to_string(), "song-2".to_string()],
        order_status: OrderStatus::Accepted,
    }
}

pub(crate) fn authorized_claims() -> Claims {
    Claims::issued_now(&authorized_identity(), test_order())
}

pub(crate) fn mint_token(claims: &Claims, key: &EncodingKey) -> String {
    crate::token::sign(claims, key).expect("Failed to sign test token")
}

/// Verification fake with a canned outcome and a call counter.
pub(crate) struct FakeVerifier {
    outcome: VerificationOutcome,
    calls: AtomicUsize,
}

impl FakeVerifier {
    pub(crate) fn allow() -> Self {
        Self {
            outcome: VerificationOutcome::Success(serde_json::json!({"order": "ok"})),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn deny(message: &str, status_code: u16) -> Self {
        Self {
            outcome: VerificationOutcome::Failure {
                message: message.to_string(),
                status_code,
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderVerification for FakeVerifier {
    async fn verify(&self, _order: &OrderMetadata) -> VerificationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Store fake with canned results and per-operation call counters.
pub(crate) struct FakeStore {
    pub(crate) upload_part_calls: AtomicUsize,
    pub(crate) complete_calls: AtomicUsize,
    pub(crate) abort_calls: AtomicUsize,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self {
            upload_part_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            abort_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_object(&self, key: &str) -> Result<StoredObject, StoreError> {
        Err(StoreError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        key: &str,
    ) -> Result<MultipartUploadHandle, StoreError> {
        Ok(MultipartUploadHandle {
            object_key: key.to_string(),
            upload_id: "fake-upload-id".to_string(),
        })
    }

    async fn upload_part(
        &self,
        _handle: &MultipartUploadHandle,
        part_number: u32,
        _data: Bytes,
    ) -> Result<UploadedPart, StoreError> {
        self.upload_part_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UploadedPart {
            part_number,
            etag: "\"fakepartetag\"".to_string(),
        })
    }

    async fn complete_multipart_upload(
        &self,
        _handle: &MultipartUploadHandle,
        _parts: &[UploadedPart],
    ) -> Result<String, StoreError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        Ok("\"fakefinaletag\"".to_string())
    }

    async fn abort_multipart_upload(
        &self,
        _handle: &MultipartUploadHandle,
    ) -> Result<(), StoreError> {
        self.abort_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
