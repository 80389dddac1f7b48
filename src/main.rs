use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use tourguide_backend::core;
use tourguide_backend::core::config::AppPaths;
use tourguide_backend::server;
use tourguide_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    core::logging::init(&paths);

    let state = AppState::initialize(paths).await?;

    let server_config = &state.settings.server;
    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(server_config.port);
    let bind_addr = format!("{}:{}", server_config.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    tracing::info!(
        "Listening on {} (config: {})",
        addr,
        state.config.config_path().display()
    );

    let app: Router = server::router::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
