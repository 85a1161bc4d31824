use price_predictor_backend::{api, AppState, ServiceConfig, ServiceContext};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::from_env()?;
    tracing::info!("starting with {:?}", cfg);

    // Blocking load before the listener comes up
    let ctx = {
        let cfg = cfg.clone();
        tokio::task::spawn_blocking(move || ServiceContext::build(&cfg)).await?
    };
    let summary = ctx.summary();
    tracing::info!(
        "context ready; dataset_loaded={} records={} cities={} mode={:?}",
        summary.dataset_loaded,
        summary.records,
        summary.cities,
        summary.mode
    );

    let port = cfg.port;
    let app = api::router(AppState::new(ctx, cfg));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
