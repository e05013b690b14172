//! Trellis Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use trellis_core::TrellisConfig;

/// Main Trellis web server
pub struct TrellisServer {
    config: WebConfig,
    state: AppState,
}

impl TrellisServer {
    /// Create a server, loading the Trellis configuration from its sources
    pub fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Create a server from an already loaded configuration
    pub fn with_settings(config: WebConfig, settings: TrellisConfig) -> WebResult<Self> {
        let state = AppState::with_settings(config.clone(), settings)?;
        Ok(Self { config, state })
    }

    /// Start the web server; returns after Ctrl-C
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!(address = %address, dev_mode = self.config.dev_mode, "Starting Trellis web server");

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!(
            open_sessions = self.state.sessions.active_sessions(),
            "Server shut down"
        );
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Builder for TrellisServer
pub struct TrellisServerBuilder {
    config: WebConfig,
    settings: Option<TrellisConfig>,
}

impl TrellisServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
            settings: None,
        }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable development mode
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    /// Set the Trellis configuration file
    pub fn config_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.config_path = Some(path.into());
        self
    }

    /// Set the allowed CORS origins
    pub fn allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.config.allowed_origins = origins;
        self
    }

    /// Use an already loaded configuration instead of reading the sources
    pub fn settings(mut self, settings: TrellisConfig) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build the server
    pub fn build(self) -> WebResult<TrellisServer> {
        match self.settings {
            Some(settings) => TrellisServer::with_settings(self.config, settings),
            None => TrellisServer::new(self.config),
        }
    }
}

impl Default for TrellisServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
