use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use passvault::{config::Config, routes, state::AppState};

/// How often expired sessions are swept from the store.
const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let app = routes::router(state.clone());

    let purge_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(PURGE_INTERVAL).await;
            tracing::info!("🧹 Running scheduled purge of expired sessions...");
            match purge_state.sessions.purge_expired().await {
                Ok(removed) => {
                    tracing::info!("✅ Purge completed, {} sessions removed", removed);
                }
                Err(e) => {
                    tracing::error!("❌ Purge failed: {}", e);
                }
            }
        }
    });

    let addr = config.bind_addr;
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ Background purge job started (runs every hour)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
