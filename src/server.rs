//! HTTP server setup and lifecycle management.

use std::net::SocketAddr;
use std::num::NonZeroU16;
use std::path::PathBuf;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::handlers::GatewayHandler;
use crate::store::{FilesystemStore, ObjectStore};
use crate::verifier::{OrderVerification, RemoteVerifier};

/// Main server struct holding configuration and state.
pub struct Server {
    bind_address: String,
    port: NonZeroU16,
    root_dir: PathBuf,
    config: Arc<GatewayConfig>,
}

impl Server {
    pub fn new(
        bind_address: String,
        port: NonZeroU16,
        root_dir: PathBuf,
        config: GatewayConfig,
    ) -> Self {
        Self {
            bind_address,
            port,
            root_dir,
            config: Arc::new(config),
        }
    }

    /// Create a server instance bound to an ephemeral localhost port.
    /// Used by the integration tests.
    pub async fn test_mode(
        root_dir: PathBuf,
        config: GatewayConfig,
    ) -> Result<(Self, u16), GatewayError> {
        let host = "127.0.0.1".to_string();
        let listener = TcpListener::bind(format!("{host}:0")).await?;
        let port = listener.local_addr()?.port();
        let port = NonZeroU16::try_from(port).map_err(|_| {
            GatewayError::Configuration(format!("failed to convert port '{port}' to NonZeroU16"))
        })?;
        drop(listener);

        Ok((
            Self {
                bind_address: host,
                port,
                root_dir,
                config: Arc::new(config),
            },
            port.get(),
        ))
    }

    pub async fn run(self) -> Result<(), GatewayError> {
        let addr = format!("{}:{}", self.bind_address, self.port);
        let addr: SocketAddr = addr
            .parse()
            .map_err(|err| GatewayError::Configuration(format!("failed to parse address '{addr}': {err}")))?;

        let store: Arc<dyn ObjectStore> = Arc::new(FilesystemStore::new(&self.root_dir));
        let verifier: Arc<dyn OrderVerification> = Arc::new(RemoteVerifier::new(&self.config)?);
        let handler = Arc::new(GatewayHandler::new(self.config.clone(), verifier, store));

        let listener = TcpListener::bind(addr).await?;
        info!(
            root_dir = ?self.root_dir,
            address = %addr,
            verify_endpoint = %self.config.verify_endpoint(),
            authorized_subject = %self.config.authorized_identity.subject,
            "Starting ordergate..."
        );

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            debug!(remote_addr = %remote_addr, "Accepted new connection");

            let io = TokioIo::new(stream);
            let handler = handler.clone();

            tokio::task::spawn(async move {
                if let Err(err) = http1::Builder::new()
                    .serve_connection(
                        io,
                        service_fn(move |req| {
                            let handler = Arc::clone(&handler);
                            async move { handler.handle_request(req).await }
                        }),
                    )
                    .await
                {
                    debug!(error = %err, remote_addr = %remote_addr, "Error serving connection");
                }
            });
        }
    }
}
