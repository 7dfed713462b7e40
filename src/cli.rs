use std::num::NonZeroU16;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
pub struct Cli {
    #[clap(short, long, default_value = "8090", env = "ORDERGATE_PORT")]
    pub port: NonZeroU16,

    #[clap(long, default_value = "127.0.0.1", env = "ORDERGATE_HOST")]
    pub host: String,

    #[clap(short, long, default_value = "./data", env = "ORDERGATE_ROOT_DIR")]
    pub root_dir: PathBuf,

    /// PEM file with the issuer's RSA public key, used to verify inbound
    /// tokens.
    #[clap(long, env = "ORDERGATE_VERIFICATION_KEY")]
    pub verification_key: PathBuf,

    /// PEM file with the gateway's own RSA private key, used to sign
    /// outbound tokens.
    #[clap(long, env = "ORDERGATE_SIGNING_KEY")]
    pub signing_key: PathBuf,

    /// Name of the cookie carrying the capability token, inbound and
    /// outbound.
    #[clap(long, default_value = "token", env = "ORDERGATE_COOKIE_NAME")]
    pub cookie_name: String,

    /// Base URL of the order verification service.
    #[clap(long, env = "ORDERGATE_VERIFIER_URL")]
    pub verifier_url: String,

    #[clap(long, default_value = "v1", env = "ORDERGATE_VERIFIER_API_VERSION")]
    pub verifier_api_version: String,

    // The one caller identity inbound tokens must match exactly.
    #[clap(long, env = "ORDERGATE_AUTHORIZED_SUBJECT")]
    pub authorized_subject: String,

    #[clap(long, env = "ORDERGATE_AUTHORIZED_REALM")]
    pub authorized_realm: String,

    #[clap(long, env = "ORDERGATE_AUTHORIZED_AUDIENCE")]
    pub authorized_audience: String,

    #[clap(long, env = "ORDERGATE_AUTHORIZED_CLIENT_ID")]
    pub authorized_client_id: String,

    // The identity the gateway authors outbound tokens as.
    #[clap(long, env = "ORDERGATE_SERVICE_SUBJECT")]
    pub service_subject: String,

    #[clap(long, env = "ORDERGATE_SERVICE_REALM")]
    pub service_realm: String,

    #[clap(long, env = "ORDERGATE_SERVICE_AUDIENCE")]
    pub service_audience: String,

    #[clap(long, env = "ORDERGATE_SERVICE_CLIENT_ID")]
    pub service_client_id: String,
}
