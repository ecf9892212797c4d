use anyhow::Context;
use server::{app, config::Config, AppState};
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = AppState::open(&config.storage_dir)
        .with_context(|| format!("opening storage at {}", config.storage_dir.display()))?;
    info!(storage = %config.storage_dir.display(), "storage ready");

    // Serve the WASM dist with SPA fallback; assumes `web/dist` built via Trunk
    let index = config.static_dir.join("index.html");
    let app = app(state)
        .fallback_service(ServeDir::new(&config.static_dir).fallback(ServeFile::new(index)));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
