use anyhow::Context;

use capledger_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    capledger_observability::init();

    let config = ApiConfig::from_env().context("failed to load configuration")?;
    let app = capledger_api::app::build_app(&config).context("failed to build ledger")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        capacity_limit = config.ledger.capacity_limit,
        withdrawal_limit = config.ledger.withdrawal_limit,
        "listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;
    Ok(())
}
