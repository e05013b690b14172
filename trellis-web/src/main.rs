//! Trellis Web Server
//!
//! Serves guarded pages and the idle-session API.

use anyhow::Context;
use clap::Parser;
use trellis_web::config_loader::ConfigLoader;
use trellis_web::server::TrellisServerBuilder;
use trellis_web::{init_logging, WebConfig};

/// Trellis Web Server - route protection and idle-session timeout
#[derive(Parser)]
#[command(name = "trellis-web")]
#[command(about = "Route protection and idle-session timeout for Trellis workspaces")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Trellis configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = WebConfig::from_env();
    config.host = args.host;
    config.port = args.port;
    config.dev_mode = config.dev_mode || args.dev;
    if args.config.is_some() {
        config.config_path = args.config;
    }

    let mut loader = ConfigLoader::new();
    if let Some(path) = &config.config_path {
        loader = loader.with_config_file(path);
    }
    let settings = loader.load().context("Failed to load Trellis configuration")?;

    init_logging(&settings.logging, args.log_level.as_deref(), config.dev_mode)?;

    tracing::info!(
        idle_timeout_minutes = settings.session.idle_timeout_minutes,
        warning_minutes = settings.session.warning_minutes,
        "Configuration loaded"
    );

    let mut builder = TrellisServerBuilder::new()
        .host(config.host.clone())
        .port(config.port)
        .dev_mode(config.dev_mode)
        .allowed_origins(config.allowed_origins.clone())
        .settings(settings);
    if let Some(path) = config.config_path.clone() {
        builder = builder.config_path(path);
    }

    let server = builder.build().context("Failed to build server")?;
    server.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        // Test default values
        let args = Args::parse_from(["trellis-web"]);
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert!(!args.dev);
        assert!(args.config.is_none());
        assert!(args.log_level.is_none());

        // Test custom values
        let args = Args::parse_from([
            "trellis-web",
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
            "--dev",
            "--config",
            "trellis.toml",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 3000);
        assert!(args.dev);
        assert_eq!(args.config.as_deref(), Some("trellis.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
