//! Layered configuration loading
//!
//! Precedence, lowest first: built-in defaults, the user config file
//! (`~/.config/trellis/config.toml`), an explicit `--config` file, then
//! `TRELLIS__<SECTION>__<KEY>` environment variables.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use trellis_core::TrellisConfig;

pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    use_user_config: bool,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_file: None,
            use_user_config: true,
            env_prefix: "TRELLIS".to_string(),
        }
    }

    /// Explicit configuration file; it must exist
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Skip `~/.config/trellis/config.toml`
    pub fn without_user_config(mut self) -> Self {
        self.use_user_config = false;
        self
    }

    /// Set the environment variable prefix (default: "TRELLIS")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn load(self) -> Result<TrellisConfig> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&TrellisConfig::default())?);

        if self.use_user_config {
            if let Some(user_file) = TrellisConfig::default_path().filter(|path| path.exists()) {
                builder = builder.add_source(
                    config::File::from(user_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        if let Some(file) = &self.config_file {
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: TrellisConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
