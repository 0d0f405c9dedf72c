use hudini_server::{init_tracing, run};
use hudini_store::Config;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    tracing::info!(
        providers = config.pms.providers.len(),
        property_id = %config.pms.property_id,
        "Starting Hudini PMS integration"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        signal.cancel();
    });

    run(config, shutdown).await
}
