//! Trellis Core - Shared infrastructure for the access and session subsystem
//!
//! This module defines the error model, logging bootstrap, configuration file
//! model and the collaborator traits that the higher-level crates build upon

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
