//! Match Controller
//!
//! Stateful WebSocket server for real-time two-player tic-tac-toe
//! matchmaking and game sessions.
//!
//! # Servers
//!
//! One HTTP listener (default: 0.0.0.0:8080) serves:
//! - `GET /ws` - the WebSocket endpoint clients connect to
//! - `GET /health`, `GET /ready` - liveness/readiness probes
//! - `GET /metrics` - Prometheus metrics
//!
//! # Startup Flow
//!
//! 1. Initialize tracing from `RUST_LOG`
//! 2. Load configuration from environment
//! 3. Install the Prometheus metrics recorder
//! 4. Create the client registry and spawn the controller actor
//! 5. Bind and serve the router
//! 6. Wait for Ctrl+C / SIGTERM, then drain the actor tree

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use match_controller::actors::{ControllerMetrics, MatchControllerHandle};
use match_controller::channel::{ClientRegistry, EventSink};
use match_controller::config::Config;
use match_controller::observability::{health_router, HealthState};
use match_controller::transport::{ws_router, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "match_controller=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Match Controller");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        mc_id = %config.mc_id,
        bind_address = %config.bind_address,
        search_update_interval_ms = config.search_update_interval_ms,
        max_sessions = config.max_sessions,
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before any counter is touched.
    let prometheus_handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        format!("Failed to install Prometheus metrics recorder: {e}")
    })?;

    let health_state = Arc::new(HealthState::new());
    let registry = ClientRegistry::new();
    let metrics = ControllerMetrics::new();

    let controller = MatchControllerHandle::new(
        config.mc_id.clone(),
        Arc::clone(&registry) as Arc<dyn EventSink>,
        Arc::clone(&metrics),
        Duration::from_millis(config.search_update_interval_ms),
        config.max_sessions,
    );
    info!("Actor system initialized");

    let shutdown_token = controller.child_token();

    let app_state = AppState {
        controller: controller.clone(),
        registry: Arc::clone(&registry),
        metrics: Arc::clone(&metrics),
    };

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = ws_router(app_state)
        .merge(health_router(Arc::clone(&health_state)))
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http());

    // Bind before spawning to fail fast on bind errors.
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        format!("Invalid bind address: {e}")
    })?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind server");
        format!("Failed to bind server to {addr}: {e}")
    })?;
    info!(addr = %addr, "Server bound successfully");

    let server_token = shutdown_token.child_token();
    let server = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            server_token.cancelled().await;
            info!("Server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Server failed");
        }
    });

    health_state.set_ready();
    info!(addr = %addr, "Match Controller running - press Ctrl+C to shutdown");

    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Stop taking traffic first so load balancers drain us.
    health_state.set_not_ready();

    if let Err(e) = controller.shutdown().await {
        warn!(error = %e, "Actor system shutdown error");
    }

    // The controller cancels the root token; the server and all session
    // actors wind down from there.
    if let Err(e) = server.await {
        warn!(error = %e, "Server task join error");
    }

    info!("Match Controller shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable
/// because without signal handlers the service cannot shut down cleanly.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
