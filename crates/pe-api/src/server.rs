//! API server implementation.

use axum::{extract::Request, middleware, Router};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::time::Duration as CookieDuration;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::{error, field, info, info_span};

use crate::middleware::{navigation_lock, request_id, request_logging};
use crate::routes;
use crate::state::AppState;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,
    /// Shutdown timeout for graceful shutdown.
    pub shutdown_timeout: Duration,
    /// Name of the session cookie.
    pub session_cookie_name: String,
    /// Idle time after which a session expires.
    pub session_expiry_seconds: i64,
    /// Only send the session cookie over HTTPS.
    pub session_secure: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            shutdown_timeout: Duration::from_secs(30),
            session_cookie_name: "pe_session".to_string(),
            session_expiry_seconds: 8 * 60 * 60,
            session_secure: false,
        }
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    session_store: MemoryStore,
}

impl ApiServer {
    /// Creates a new API server.
    pub fn new(state: AppState, config: ApiServerConfig) -> Self {
        Self {
            config,
            state,
            session_store: MemoryStore::default(),
        }
    }

    /// Creates a new API server with default configuration.
    pub fn with_state(state: AppState) -> Self {
        Self::new(state, ApiServerConfig::default())
    }

    pub fn config(&self) -> &ApiServerConfig {
        &self.config
    }

    /// Builds the router with all middleware applied.
    pub fn router(&self) -> Router {
        self.layered(routes::create_router(self.state.clone()))
    }

    /// Wraps `app` in the server's middleware stack.
    ///
    /// The navigation lock sits inside the session layer so it can read the
    /// logged-in user; everything merged into `app` is subject to it.
    pub fn layered(&self, app: Router) -> Router {
        let sessions = SessionManagerLayer::new(self.session_store.clone())
            .with_name(self.config.session_cookie_name.clone())
            .with_secure(self.config.session_secure)
            .with_expiry(Expiry::OnInactivity(CookieDuration::seconds(
                self.config.session_expiry_seconds,
            )));

        // Order matters: innermost first
        app.layer(middleware::from_fn_with_state(
            self.state.clone(),
            navigation_lock,
        ))
        .layer(sessions)
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                // Path only: the query may carry a reset token.
                info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = field::Empty,
                )
            }),
        )
        .layer(CatchPanicLayer::new())
    }

    /// Runs the server until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<(), std::io::Error> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the server with a custom shutdown signal.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server shut down gracefully");
        Ok(())
    }
}

/// Default shutdown signal handler.
///
/// A handler that cannot be installed never fires; the other one still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
