//! Wallet Auth Server
//!
//! Authenticates Cardano wallet holders by their stake address and serves
//! session-gated routes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::signal;
use tower_http::cors::CorsLayer;

use wallet_auth::auth::{AuthService, AuthSettings, StaticRegistry};
use wallet_auth::config::Config;
use wallet_auth::routes;
use wallet_auth::session::{self, InMemorySessionStore, SessionManager, SystemClock};
use wallet_auth::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting wallet auth server");

    // The allow-list must load in full or the server does not start
    let registry = StaticRegistry::from_sources(
        &config.registered_identities,
        config.registered_identities_file.as_deref(),
    )
    .context("Failed to load registered identities")?;

    if registry.is_empty() {
        tracing::warn!("No registered identities configured, every authentication will be rejected");
    } else {
        tracing::info!(count = registry.len(), "Loaded registered identities");
    }

    let sessions = Arc::new(SessionManager::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(SystemClock),
        config.session_ttl,
    ));

    let auth_service = Arc::new(AuthService::new(
        Arc::new(registry),
        sessions.clone(),
        AuthSettings {
            address_framing: config.address_framing,
            require_key_binding: config.require_key_binding,
        },
    ));

    if !config.require_key_binding {
        tracing::warn!("Key binding disabled, signatures are not tied to the stake credential");
    }

    let app_state = AppState::new(auth_service, sessions.clone(), config.cookie_settings());

    // Start expiry sweeper in background
    let sweep_interval = std::time::Duration::from_secs(config.session_sweep_interval_seconds);
    tokio::spawn(session::run_expiry_sweeper(sessions, sweep_interval));

    let app = routes::app_router(app_state)
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    let addr = SocketAddr::new(config.bind_address, config.port);

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    // Credentialed requests are needed for the session cookie
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
