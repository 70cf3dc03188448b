//! Tracing bootstrap for portal binaries.
//!
//! ```ignore
//! use portal_common::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init_tracing(TelemetryConfig::from_env("portal-editor"));
//! tracing::info!("started");
//! ```

use std::env;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Where logs go and how much of them.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Logged once when tracing comes up.
    pub service_name: String,
    /// Level used when `RUST_LOG` is unset.
    pub level: Level,
    /// Include file and line in each event.
    pub source_locations: bool,
}

impl TelemetryConfig {
    /// Defaults for `service_name`, adjusted by the environment.
    ///
    /// `PORTAL_LOG_LEVEL` picks the default level (DEBUG in debug builds,
    /// INFO otherwise). `PORTAL_LOG_SOURCE=1` turns on source locations.
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let fallback = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let level = env::var("PORTAL_LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback);
        let source_locations = env::var("PORTAL_LOG_SOURCE").is_ok_and(|v| v == "1");

        Self {
            service_name: service_name.into(),
            level,
            source_locations,
        }
    }
}

/// Install a compact stderr fmt layer. `RUST_LOG` overrides the level.
///
/// Later calls are ignored.
pub fn init_tracing(config: TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(config.source_locations)
        .with_line_number(config.source_locations)
        .compact()
        .with_filter(filter);

    if tracing_subscriber::registry().with(stderr).try_init().is_ok() {
        tracing::debug!(service = %config.service_name, "tracing initialized");
    }
}
