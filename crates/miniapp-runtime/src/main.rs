//! Mini App gateway server binary.

mod config;

use anyhow::Result;
use miniapp_gateway::GatewayService;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::from_env()?;
    info!(
        version = miniapp_gateway::VERSION,
        addr = %config.http_addr(),
        default_brand = %config.brands.default_brand,
        "Starting Mini App gateway"
    );

    let service = GatewayService::new(config)?;
    service.start().await?;

    info!("Gateway stopped");
    Ok(())
}
