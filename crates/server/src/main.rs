//! Dispatch Agent Server Entry Point

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use dispatch_agent_config::{load_settings, Settings};
use dispatch_agent_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("DISPATCH_AGENT_ENV").ok();
    let settings = load_settings(env.as_deref())?;

    init_tracing(&settings);

    tracing::info!("Starting Dispatch Agent Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(env = env.as_deref().unwrap_or("default"), "Loaded configuration");

    let store = dispatch_agent_persistence::build_store(&settings.persistence).await?;
    let extractor = dispatch_agent_llm::build_extractor(&settings.extraction)?;

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let metrics_enabled = settings.observability.metrics_enabled;

    let mut state = AppState::new(settings, store, extractor);
    if metrics_enabled {
        state = state.with_metrics(init_metrics()?);
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let cleanup_shutdown = state.trackers.start_cleanup_task();
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if cleanup_shutdown.send(true).is_err() {
        tracing::debug!("Tracker cleanup task already stopped");
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!("dispatch_agent={level},tower_http=info").into()
    });

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
}
