//! Web server implementation.

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::{error, info};

use crate::auth::verify_csrf;
use crate::middleware::{request_id, request_logging, security_headers};
use crate::routes;
use crate::state::AppState;
use crate::web;

/// Session cookie settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cookie name.
    pub cookie_name: String,
    /// Idle time after which a session expires.
    pub expiry: Duration,
    /// Send the cookie over HTTPS only.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "kh_session".to_string(),
            expiry: Duration::from_secs(86_400),
            secure: false,
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Session cookie settings.
    pub session: SessionConfig,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_secs(30),
            session: SessionConfig::default(),
        }
    }
}

/// Web server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Creates a new server.
    pub fn new(state: AppState, config: ApiServerConfig) -> Self {
        Self { config, state }
    }

    /// Creates a new server with default configuration.
    pub fn with_state(state: AppState) -> Self {
        Self::new(state, ApiServerConfig::default())
    }

    fn session_layer(&self) -> SessionManagerLayer<MemoryStore> {
        let session = &self.config.session;
        let expiry = time::Duration::seconds(session.expiry.as_secs().min(i64::MAX as u64) as i64);
        SessionManagerLayer::new(MemoryStore::default())
            .with_name(session.cookie_name.clone())
            .with_secure(session.secure)
            .with_http_only(true)
            .with_same_site(SameSite::Lax)
            .with_expiry(Expiry::OnInactivity(expiry))
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        routes::health::init_start_time();

        let static_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static");

        // Layers run outermost-last; CSRF checks need the session.
        routes::create_router(self.state.clone())
            .merge(web::create_web_router(self.state.clone()))
            .nest_service("/static", ServeDir::new(static_path))
            .layer(middleware::from_fn(verify_csrf))
            .layer(self.session_layer())
            .layer(middleware::from_fn(security_headers))
            .layer(middleware::from_fn(request_logging))
            .layer(middleware::from_fn(request_id))
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(self.config.request_timeout))
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

        info!("Starting web server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Web server shut down gracefully");
        Ok(())
    }
}

/// Default shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
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

#[cfg(test)]
mod tests {
    use super::*;
    use kh_core::db::{create_pool, run_migrations};

    #[tokio::test]
    async fn test_router_creation() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let server = ApiServer::with_state(AppState::new(pool));
        let _router = server.router();
    }

    #[tokio::test]
    async fn test_run_until_stops_on_signal() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let config = ApiServerConfig {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Default::default()
        };
        let server = ApiServer::new(AppState::new(pool), config);
        server.run_until(async {}).await.unwrap();
    }

    #[test]
    fn test_default_session_config() {
        let config = ApiServerConfig::default();
        assert_eq!(config.session.cookie_name, "kh_session");
        assert_eq!(config.session.expiry, Duration::from_secs(86_400));
        assert!(!config.session.secure);
    }
}
