//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::HubConfig, domain::Authenticator, hub::ServerHandle, usecase::LoginUseCase,
};

use super::{
    handler::{get_house_detail, get_houses, health_check, login, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// HTTP front of the hub
///
/// # Example
///
/// ```ignore
/// let server = Server::new(hub, hub_config, authenticator, login_usecase);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `server` - Handle of the running hub
    /// * `hub_config` - Session settings applied to every connection
    /// * `authenticator` - Resolves bearer tokens on upgrade
    /// * `login_usecase` - UseCase for login
    pub fn new(
        server: ServerHandle,
        hub_config: Arc<HubConfig>,
        authenticator: Arc<dyn Authenticator>,
        login_usecase: Arc<LoginUseCase>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                server,
                hub_config,
                authenticator,
                login_usecase,
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(websocket_handler))
            .route("/api/login", post(login))
            .route("/api/health", get(health_check))
            .route("/api/houses", get(get_houses))
            .route("/api/houses/{house_id}", get(get_house_detail))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Run the hub server until Ctrl+C / SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Hub server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?bearer=<token>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
