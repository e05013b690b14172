//! Trellis Web Server
//!
//! Applies the access layer to real HTTP routes: page routes go through the
//! route guard, and the idle-session protocol is exposed as JSON endpoints.

pub mod auth;
pub mod config_loader;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod sessions;
pub mod state;
pub mod templates;

// Re-export main types
pub use server::{TrellisServer, TrellisServerBuilder};
pub use sessions::SessionRegistry;
pub use state::AppState;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use trellis_core::{LogFormat, LoggingConfig};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static(auth::USER_ID_HEADER),
            HeaderName::from_static(auth::USER_ROLE_HEADER),
            HeaderName::from_static(auth::SYSTEM_ROLE_HEADER),
        ]);

    Router::new()
        .nest("/api", routes::api_routes())
        .merge(routes::page_routes(state.routes()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
    /// Trellis configuration file (TOML)
    pub config_path: Option<String>,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            config_path: None,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("TRELLIS_HOST").unwrap_or(defaults.host),
            port: std::env::var("TRELLIS_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            dev_mode: std::env::var("TRELLIS_DEV_MODE")
                .ok()
                .and_then(|flag| flag.parse().ok())
                .unwrap_or(defaults.dev_mode),
            config_path: std::env::var("TRELLIS_CONFIG").ok(),
            allowed_origins: std::env::var("TRELLIS_ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Access error: {0}")]
    Access(#[from] trellis_access::AccessError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Initialize logging for the web server
///
/// `level` overrides the configured base level; `RUST_LOG` still wins.
pub fn init_logging(config: &LoggingConfig, level: Option<&str>, dev_mode: bool) -> WebResult<()> {
    let mut config = config.clone();
    if let Some(level) = level {
        config.level = level.to_string();
    }
    if dev_mode {
        config.format = LogFormat::Pretty;
    }
    config
        .filter_directives
        .push("tower_http=debug".to_string());

    trellis_core::init_logging(&config)
        .map_err(|e| WebError::Config(format!("Failed to initialize logging: {}", e)))
}
