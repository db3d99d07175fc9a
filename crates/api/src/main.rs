use std::sync::Arc;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let services = Arc::new(stockroom_api::app::services::build_services().await);

    let seed = std::env::var("STOCKROOM_SEED")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if seed {
        stockroom_infra::seed::seed_demo_stock(services.stock()).context("seeding demo stock")?;
    }

    let app = stockroom_api::app::build_app_with(services);

    let addr = std::env::var("STOCKROOM_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
