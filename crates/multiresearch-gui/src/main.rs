use anyhow::Result;
use axum::Router;
use multiresearch_core::remove_stale_logs;
use multiresearch_gui::state::AppState;
use multiresearch_gui::telemetry::init_tracing;
use multiresearch_gui::{config, routes};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match remove_stale_logs() {
        Ok(removed) if removed > 0 => info!(removed, "pruned stale run logs"),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "failed to prune stale run logs"),
    }

    let config = config::AppConfig::from_env();
    let state = AppState::try_new(&config)?;

    let app: Router = routes::build_router(state);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(address = %config.listen_addr, "multiresearch-gui listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            error!(error = %err, "server shutdown with error");
            err
        })?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            stream.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
