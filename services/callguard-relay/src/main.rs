use std::sync::Arc;

use callguard_core::logging;
use callguard_relay::{AppState, Config};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;
    logging::init_with(config.log_format);

    let state = Arc::new(AppState::new(&config)?);
    let app = callguard_relay::router(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        lock_file = %config.lock_file.display(),
        "Callguard relay listening on {}", bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
