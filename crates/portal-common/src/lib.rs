//! Shared types for the portal editor crates.
//!
//! - `config`: host-facing editor configuration and upload settings
//! - `telemetry`: tracing bootstrap for binaries (feature `telemetry`)

pub mod config;
#[cfg(feature = "telemetry")]
pub mod telemetry;

pub use config::{ConfigError, EditorConfig, ImageDomainType, ImageServerType, UploadConfig};
