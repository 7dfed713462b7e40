use clap::Parser;
use ordergate::cli::Cli;
use ordergate::config::GatewayConfig;
use ordergate::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ordergate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::from_cli(&cli).await?;

    let server = Server::new(cli.host, cli.port, cli.root_dir, config);
    server.run().await.map_err(|err| {
        eprintln!("Server error: {}", err);
        err.into()
    })
}
