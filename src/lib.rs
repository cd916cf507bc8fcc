//! # Sensor Exporter
//!
//! A Prometheus exporter for hardware telemetry. Every scrape queries chip
//! sensors (fans, temperatures, voltages, power), an hddtemp daemon for disk
//! temperatures and a CyberPower UPS, then serves the readings in the text
//! exposition format.
//!
//! A failing source only drops its own metric families from the scrape; the
//! others are still served.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sensor_exporter::{start_web_server, ExporterConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExporterConfig::default();
//!     let orchestrator = Arc::new(config.build_orchestrator().await?);
//!
//!     // Serve on :9255/metrics
//!     start_web_server(&config.web, orchestrator).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod web;

// Re-export public API
pub use config::ExporterConfig;
pub use error::{ExporterError, ProtocolErrorKind, Result};
pub use metrics::{
    Collector, DescriptorTable, FailurePolicy, HddRecord, HddTempClient, MetricDescriptor,
    Orchestrator, Sample,
};
pub use web::{create_app, start_web_server, AppState, WebConfig};

/// The default listen address (all interfaces)
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9255";

/// The default metrics path
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// The default hddtemp daemon address
pub const DEFAULT_HDDTEMP_ADDRESS: &str = "10.0.10.6:7634";

/// The default hwmon sysfs root
pub const DEFAULT_HWMON_PATH: &str = "/sys/class/hwmon";

/// The default UPS status command
pub const DEFAULT_PWRSTAT_COMMAND: &str = "pwrstat";
