//! student-kv HTTP API server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use student_kv::server::{init_logging, router, AppState, BackendKind, Config, CorsConfig};

/// student-kv HTTP API server.
#[derive(Parser, Debug)]
#[command(name = "student-kv-server")]
#[command(about = "HTTP API server for the student-kv document store")]
struct Args {
    /// Path to the configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "STUDENT_KV_CONFIG")]
    config: Option<PathBuf>,
}

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        // Deny all cross-origin requests by default
        return CorsLayer::new();
    }

    let mut cors = CorsLayer::new();

    let any_origin = config.allow_origins.iter().any(|o| o == "*");
    if any_origin {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<_> = config
        .allow_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    cors = cors.allow_methods(methods);

    let headers: Vec<_> = config
        .allow_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();
    cors = cors.allow_headers(headers);

    // Credentials cannot be combined with a wildcard origin
    if config.allow_credentials && any_origin {
        tracing::warn!("ignoring allow_credentials with wildcard origin");
    } else if config.allow_credentials {
        cors = cors.allow_credentials(true);
    }

    cors.max_age(Duration::from_secs(config.max_age))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration first (needed for logging setup)
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let bind_addr = config.bind_addr();

    init_logging(&config.logging)?;

    match config.store.backend {
        BackendKind::Fjall => tracing::info!("Opening store at {}", config.store.path.display()),
        BackendKind::Memory => tracing::info!("Using in-memory store"),
    }
    let state = AppState::from_config(&config)?;

    let cors = build_cors_layer(&config.cors);
    if config.cors.enabled {
        tracing::info!(
            "CORS enabled with {} allowed origin(s)",
            config.cors.allow_origins.len()
        );
    } else {
        tracing::info!("CORS disabled (denying cross-origin requests)");
    }

    let app: Router = router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = bind_addr.parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
