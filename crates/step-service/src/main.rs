use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use step_service::{router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("invalid log filter `{}`", config.log_filter))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let temp_dir = config.temp_dir();
    std::fs::create_dir_all(&temp_dir)
        .with_context(|| format!("cannot create temp dir {}", temp_dir.display()))?;

    let bind = config.bind.clone();
    let state = AppState::with_truck_kernel(config);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("cannot bind {bind}"))?;

    tracing::info!(
        bind = %bind,
        temp_dir = %temp_dir.display(),
        kernel = state.pipeline.kernel().name(),
        "step-service listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
