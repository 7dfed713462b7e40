//! Process configuration, resolved once at startup.
//!
//! Everything the components need — identities, key handles, endpoint
//! coordinates — lives in one immutable [`GatewayConfig`] value passed by
//! reference into every constructor. There is no ambient or static access.

use jsonwebtoken::{DecodingKey, EncodingKey};
use tokio::fs;
use tracing::debug;

use crate::cli::Cli;
use crate::error::GatewayError;

/// A logical caller or service identity, as a token claim four-tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub realm: String,
    pub audience: String,
    pub client_id: String,
}

/// Immutable process-wide configuration.
///
/// The two key handles deliberately have distinct types and directions of
/// trust: `verification_key` only ever checks inbound signatures, and
/// `signing_key` only ever authors outbound ones.
pub struct GatewayConfig {
    /// The one identity inbound token claims must match exactly.
    pub authorized_identity: Identity,
    /// The identity the gateway signs outbound tokens as.
    pub service_identity: Identity,
    pub cookie_name: String,
    pub verifier_base_url: String,
    pub verifier_api_version: String,
    pub verification_key: DecodingKey,
    pub signing_key: EncodingKey,
}

impl GatewayConfig {
    pub async fn from_cli(cli: &Cli) -> Result<Self, GatewayError> {
        let pem = fs::read(&cli.verification_key).await.map_err(|e| {
            GatewayError::Configuration(format!(
                "failed to read verification key {}: {}",
                cli.verification_key.display(),
                e
            ))
        })?;
        let verification_key = DecodingKey::from_rsa_pem(&pem).map_err(|e| {
            GatewayError::Configuration(format!("invalid verification key: {}", e))
        })?;

        let pem = fs::read(&cli.signing_key).await.map_err(|e| {
            GatewayError::Configuration(format!(
                "failed to read signing key {}: {}",
                cli.signing_key.display(),
                e
            ))
        })?;
        let signing_key = EncodingKey::from_rsa_pem(&pem)
            .map_err(|e| GatewayError::Configuration(format!("invalid signing key: {}", e)))?;

        debug!(
            verification_key = ?cli.verification_key,
            signing_key = ?cli.signing_key,
            "Loaded key material"
        );

        Ok(Self {
            authorized_identity: Identity {
                subject: cli.authorized_subject.clone(),
                realm: cli.authorized_realm.clone(),
                audience: cli.authorized_audience.clone(),
                client_id: cli.authorized_client_id.clone(),
            },
            service_identity: Identity {
                subject: cli.service_subject.clone(),
                realm: cli.service_realm.clone(),
                audience: cli.service_audience.clone(),
                client_id: cli.service_client_id.clone(),
            },
            cookie_name: cli.cookie_name.clone(),
            verifier_base_url: cli.verifier_url.trim_end_matches('/').to_string(),
            verifier_api_version: cli.verifier_api_version.clone(),
            verification_key,
            signing_key,
        })
    }

    pub fn verify_endpoint(&self) -> String {
        format!(
            "{}/api/{}/order/verify",
            self.verifier_base_url, self.verifier_api_version
        )
    }
}
