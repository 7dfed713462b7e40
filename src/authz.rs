//! The authorization gate every request passes through before any store
//! operation.
//!
//! Allow requires all of: a token in the named cookie, a valid RS512
//! signature under the issuer's key, exact claim equality with the one
//! configured caller identity, and an explicit success from the remote
//! order verification service. Everything else is a deny, and every deny
//! looks the same to the caller.

use std::sync::Arc;

use http::HeaderMap;
use http::header::COOKIE;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::token::{self, Claims};
use crate::verifier::{OrderVerification, VerificationOutcome};

pub struct AuthorizationGate {
    config: Arc<GatewayConfig>,
    verifier: Arc<dyn OrderVerification>,
}

impl AuthorizationGate {
    pub fn new(config: Arc<GatewayConfig>, verifier: Arc<dyn OrderVerification>) -> Self {
        Self { config, verifier }
    }

    /// Run the full pipeline. On allow, hands back the verified claims; on
    /// deny, the error maps to an opaque 401.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<Claims, GatewayError> {
        let token = match extract_cookie(headers, &self.config.cookie_name) {
            Some(token) => token,
            None => {
                warn!(cookie = %self.config.cookie_name, "No credential cookie on request");
                return Err(GatewayError::Unauthorized);
            }
        };

        let claims = match token::verify(&token, &self.config.verification_key) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "Token verification failed");
                return Err(GatewayError::Unauthorized);
            }
        };

        if !self.claims_match(&claims) {
            warn!(
                sub = %claims.sub,
                realm = %claims.realm,
                aud = %claims.aud,
                client_id = %claims.may_act.client_id,
                "Token claims do not match the authorized identity"
            );
            return Err(GatewayError::Unauthorized);
        }

        match self.verifier.verify(&claims.addl).await {
            VerificationOutcome::Success(_) => {
                debug!(order_id = %claims.addl.order_id, "Authorization granted");
                Ok(claims)
            }
            VerificationOutcome::Failure {
                message,
                status_code,
            } => {
                warn!(
                    order_id = %claims.addl.order_id,
                    status = %status_code,
                    message = %message,
                    "Remote verification denied the request"
                );
                Err(GatewayError::Unauthorized)
            }
        }
    }

    /// Whitelist of exactly one logical caller identity, not a general ACL.
    fn claims_match(&self, claims: &Claims) -> bool {
        let identity = &self.config.authorized_identity;
        claims.sub == identity.subject
            && claims.realm == identity.realm
            && claims.aud == identity.audience
            && claims.may_act.client_id == identity.client_id
    }
}

/// Find a named cookie across however many `Cookie` headers the request
/// carries.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}
