//! Streamgate server binary.

use std::net::SocketAddr;
use streamgate::{create_router, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    let state = AppState::new(config.clone()).await;
    let app = create_router(state);

    let ip = config
        .host
        .parse()
        .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
    let addr = SocketAddr::new(ip, config.port);
    info!("streamgate listening on http://{}", addr);
    info!(
        backend = %config.backend_type,
        model = %config.model_id,
        "backend configured"
    );

    // Log the backend URL with credentials and path stripped.
    if let Ok(url) = url::Url::parse(&config.backend_url) {
        info!(
            "backend URL: {}://{}",
            url.scheme(),
            url.host_str().unwrap_or("unknown")
        );
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received, draining connections");
    }
}
