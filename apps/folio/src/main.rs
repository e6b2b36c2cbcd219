mod config;
mod errors;
mod layout;
mod models;
mod preview;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::layout::MountPool;
use crate::preview::session::PreviewRegistry;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio v{}", env!("CARGO_PKG_VERSION"));

    // One measurement slot per open preview session
    let pool = MountPool::new(config.preview_max_sessions);
    info!(
        "Preview pool ready: {} slots, {}ms debounce",
        config.preview_max_sessions,
        config.preview_debounce.as_millis()
    );

    let previews = Arc::new(PreviewRegistry::new(
        pool,
        config.preview_debounce,
        config.preview_idle_ttl,
    ));
    // Close sessions whose client left without a DELETE
    previews.spawn_reaper((config.preview_idle_ttl / 4).max(Duration::from_secs(1)));

    let state = AppState {
        previews,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
