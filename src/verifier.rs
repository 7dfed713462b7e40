//! Client for the remote order verification service.
//!
//! A token's signature proves who issued it; it cannot prove the order it
//! references is still valid right now. That freshness check is delegated
//! here: one authenticated GET per request, no retries. A false negative
//! only over-denies, so every failure mode collapses into [`VerificationOutcome::Failure`].

use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use reqwest::header::COOKIE;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{GatewayConfig, Identity};
use crate::error::GatewayError;
use crate::token::{self, Claims, OrderMetadata};

/// Result of one verification attempt: exactly one of a success payload or
/// an error, never both.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Success(serde_json::Value),
    Failure { message: String, status_code: u16 },
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationOutcome::Success(_))
    }
}

/// Seam between the authorization gate and the verification service; tests
/// substitute fakes here.
#[async_trait]
pub trait OrderVerification: Send + Sync {
    async fn verify(&self, order: &OrderMetadata) -> VerificationOutcome;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Production client: signs a fresh outbound token per call and attaches it
/// as a cookie credential.
pub struct RemoteVerifier {
    http: reqwest::Client,
    endpoint: String,
    cookie_name: String,
    identity: Identity,
    signing_key: EncodingKey,
}

impl RemoteVerifier {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            endpoint: config.verify_endpoint(),
            cookie_name: config.cookie_name.clone(),
            identity: config.service_identity.clone(),
            signing_key: config.signing_key.clone(),
        })
    }
}

#[async_trait]
impl OrderVerification for RemoteVerifier {
    async fn verify(&self, order: &OrderMetadata) -> VerificationOutcome {
        let claims = Claims::issued_now(&self.identity, order.clone());
        let token = match token::sign(&claims, &self.signing_key) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to sign outbound token");
                return VerificationOutcome::Failure {
                    message: e.to_string(),
                    status_code: 500,
                };
            }
        };

        let response = match self
            .http
            .get(&self.endpoint)
            .header(COOKIE, format!("{}={}", self.cookie_name, token))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Verification transport failure");
                return VerificationOutcome::Failure {
                    message: e.to_string(),
                    status_code: 500,
                };
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            match response.json::<serde_json::Value>().await {
                Ok(payload) => {
                    debug!(order_id = %order.order_id, "Order verified");
                    VerificationOutcome::Success(payload)
                }
                Err(e) => {
                    warn!(error = %e, "Verification response body unparseable");
                    VerificationOutcome::Failure {
                        message: e.to_string(),
                        status_code: 500,
                    }
                }
            }
        } else {
            let status_code = status.as_u16();
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(envelope) => envelope.error.message,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("verification failed")
                    .to_string(),
            };
            warn!(
                order_id = %order.order_id,
                status = %status_code,
                message = %message,
                "Order verification rejected"
            );
            VerificationOutcome::Failure {
                message,
                status_code,
            }
        }
    }
}
