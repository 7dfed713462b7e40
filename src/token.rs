//! Signing and verification of capability tokens.
//!
//! Tokens are compact JWS strings (header.payload.signature, base64url)
//! signed with RS512. Two distinct key pairs are in play: inbound tokens are
//! checked against the issuer's public key, outbound tokens are signed with
//! the gateway's own private key. This module is pure crypto and
//! serialization; it never touches the network.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Identity;
use crate::error::GatewayError;

/// Lifecycle states of an order, carried opaquely inside a token and
/// interpreted only by the remote verification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Accepted,
    Queued,
    WorkStarted,
    WorkCompleted,
    Delivered,
    Pending,
    Declined,
}

/// Domain payload embedded in a token. Immutable once embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMetadata {
    pub order_id: String,
    pub order_cart_id: String,
    pub order_song_ids: Vec<String>,
    pub order_status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MayAct {
    pub client_id: String,
}

/// Signed payload of a capability token.
///
/// There is no `exp` claim: token lifetime is governed by the live order
/// check against the verification service, not by a clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub realm: String,
    pub sub: String,
    pub may_act: MayAct,
    pub nbf: i64,
    pub iat: i64,
    pub addl: OrderMetadata,
    pub aud: String,
}

impl Claims {
    /// Build a fresh claim set authored as `identity`, embedding `addl`.
    pub fn issued_now(identity: &Identity, addl: OrderMetadata) -> Self {
        let now = Utc::now().timestamp();
        Self {
            realm: identity.realm.clone(),
            sub: identity.subject.clone(),
            may_act: MayAct {
                client_id: identity.client_id.clone(),
            },
            nbf: now,
            iat: now,
            addl,
            aud: identity.audience.clone(),
        }
    }
}

pub fn sign(claims: &Claims, key: &EncodingKey) -> Result<String, GatewayError> {
    encode(&Header::new(Algorithm::RS512), claims, key)
        .map_err(|e| GatewayError::Signing(e.to_string()))
}

/// Check signature validity and structural well-formedness of the payload.
///
/// Only RS512 signatures are accepted. `nbf` and `iat` are carried but not
/// compared against the clock, and no `exp` is required; the audience is
/// checked by exact match in the authorization gate rather than here.
pub fn verify(token: &str, key: &DecodingKey) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::RS512);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, key, &validation)?;
    debug!(sub = %data.claims.sub, realm = %data.claims.realm, "Token signature verified");
    Ok(data.claims)
}
