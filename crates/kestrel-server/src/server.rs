use crate::handler::{self, AppState};
use crate::{Error, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use kestrel_core::session::{SESSION_EXPOSURE_PATH, SessionRegistry};
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body in bytes
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

fn exposure_route() -> String {
    format!("{}/{{session_id}}", SESSION_EXPOSURE_PATH)
}

/// Full API: analysis, session exposure and health
pub fn create_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/analyse", post(handler::analyse))
        .route("/health", get(handler::health))
        .route(&exposure_route(), get(handler::session_exposure))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handler::panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Session exposure only, for one-shot analysis outside the API server
pub fn exposure_router(registry: SessionRegistry) -> Router {
    Router::new()
        .route(&exposure_route(), get(handler::session_exposure))
        .route("/health", get(handler::health))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Base URL that reaches `addr` from the same host
pub fn loopback_base_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}

/// The analysis HTTP server.
///
/// Binding happens before serving so the exposure base URL (which needs the
/// real port) is known when the auditor is wired up.
pub struct AnalysisServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    body_limit: usize,
}

impl AnalysisServer {
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            body_limit: config.body_limit,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL used for session exposure links
    pub fn base_url(&self) -> String {
        loopback_base_url(self.local_addr)
    }

    /// Serve until Ctrl+C
    pub async fn serve(self, state: AppState) -> Result<()> {
        self.serve_with_shutdown(state, shutdown_signal()).await
    }

    pub async fn serve_with_shutdown<F>(self, state: AppState, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = create_router(state, self.body_limit);

        tracing::info!("✓ Analysis server listening on http://{}", self.local_addr);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| Error::Server(format!("Server failed: {}", e)))?;

        tracing::info!("Analysis server stopped");
        Ok(())
    }
}

/// Serve the exposure endpoint on an ephemeral loopback port.
///
/// Returns the base URL and the serving task; abort the task when done.
pub async fn spawn_exposure_server(registry: SessionRegistry) -> Result<(String, JoinHandle<()>)> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let base_url = loopback_base_url(listener.local_addr()?);
    tracing::debug!("Session exposure listening on {}", base_url);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, exposure_router(registry)).await {
            tracing::error!("Session exposure server failed: {}", e);
        }
    });

    Ok((base_url, handle))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
}
