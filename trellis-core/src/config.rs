//! Configuration management

use crate::error::{ErrorContext, TrellisError, TrellisResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration file model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    pub session: SessionSettings,
    pub routes: RouteSettings,
    pub logging: LoggingConfig,
}

/// Idle-timeout settings, in the units operators write them in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Minutes of inactivity before the session is forcibly ended
    pub idle_timeout_minutes: u64,
    /// Minutes before the timeout at which the warning dialog opens
    pub warning_minutes: u64,
    /// How often the warning countdown is refreshed, in seconds
    pub countdown_interval_secs: u64,
}

impl SessionSettings {
    /// One week; longer idle windows are rejected
    pub const MAX_IDLE_TIMEOUT_MINUTES: u64 = 7 * 24 * 60;
    pub const MAX_COUNTDOWN_INTERVAL_SECS: u64 = 60;
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout_minutes: 30,
            warning_minutes: 5,
            countdown_interval_secs: 1,
        }
    }
}

/// Routes the access layer redirects to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    /// Sign-in page
    pub auth_route: String,
    /// Page shown when an authenticated user lacks the required role or permission
    pub unauthorized_route: String,
    /// Where authenticated users land when there is nothing to return to
    pub default_landing_route: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            auth_route: "/auth".to_string(),
            unauthorized_route: "/unauthorized".to_string(),
            default_landing_route: "/dashboard".to_string(),
        }
    }
}

impl TrellisConfig {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trellis").join("config.toml"))
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TrellisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TrellisError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: TrellisConfig = toml::from_str(&content).map_err(|e| TrellisError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> TrellisResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| TrellisError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| TrellisError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> TrellisResult<()> {
        self.session.validate()?;
        self.routes.validate()
    }
}

impl SessionSettings {
    pub fn validate(&self) -> TrellisResult<()> {
        if self.idle_timeout_minutes == 0
            || self.idle_timeout_minutes > Self::MAX_IDLE_TIMEOUT_MINUTES
        {
            return Err(crate::validation_error!(
                format!(
                    "Idle timeout ({} min) must be between 1 and {} minutes",
                    self.idle_timeout_minutes,
                    Self::MAX_IDLE_TIMEOUT_MINUTES
                ),
                "session.idle_timeout_minutes",
                "config"
            ));
        }

        if self.warning_minutes == 0 || self.warning_minutes >= self.idle_timeout_minutes {
            return Err(crate::validation_error!(
                format!(
                    "Warning lead ({} min) must be positive and below the idle timeout ({} min)",
                    self.warning_minutes, self.idle_timeout_minutes
                ),
                "session.warning_minutes",
                "config"
            ));
        }

        if self.countdown_interval_secs == 0
            || self.countdown_interval_secs > Self::MAX_COUNTDOWN_INTERVAL_SECS
        {
            return Err(crate::validation_error!(
                format!(
                    "Countdown interval must be between 1 and {} seconds",
                    Self::MAX_COUNTDOWN_INTERVAL_SECS
                ),
                "session.countdown_interval_secs",
                "config"
            ));
        }

        Ok(())
    }
}

impl RouteSettings {
    pub fn validate(&self) -> TrellisResult<()> {
        for (field, route) in [
            ("routes.auth_route", &self.auth_route),
            ("routes.unauthorized_route", &self.unauthorized_route),
            ("routes.default_landing_route", &self.default_landing_route),
        ] {
            if !route.starts_with('/') || route.contains('?') {
                return Err(crate::validation_error!(
                    format!("Route '{}' must be an absolute path without a query", route),
                    field,
                    "config"
                ));
            }
        }

        if self.default_landing_route == self.auth_route {
            return Err(crate::validation_error!(
                "Default landing route cannot be the auth route",
                "routes.default_landing_route",
                "config"
            ));
        }

        if self.unauthorized_route == self.auth_route
            || self.unauthorized_route == self.default_landing_route
        {
            return Err(crate::validation_error!(
                "Unauthorized route must differ from the auth and landing routes",
                "routes.unauthorized_route",
                "config"
            ));
        }

        Ok(())
    }
}
