use analyst_relay::config::Config;
use analyst_relay::http::start_http_server;
use analyst_relay::provider::create_provider;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    analyst_relay::load_env();

    let config = Arc::new(Config::load()?);

    tracing_subscriber::fmt()
        .with_env_filter(config.runtime.log_level.as_str())
        .init();

    info!("Starting analyst relay");

    let provider = create_provider(&config)?;
    info!(provider = provider.name(), "completion provider ready");

    start_http_server(config, provider).await?;

    Ok(())
}
