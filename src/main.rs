//! Sensor Exporter binary
//!
//! Serves chip sensor, hddtemp and UPS readings to Prometheus.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sensor_exporter::{
    start_web_server, ExporterConfig, FailurePolicy, WebConfig, DEFAULT_HDDTEMP_ADDRESS,
    DEFAULT_HWMON_PATH, DEFAULT_LISTEN_ADDRESS, DEFAULT_METRICS_PATH, DEFAULT_PWRSTAT_COMMAND,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "sensor_exporter")]
#[command(about = "Prometheus exporter for hardware sensors, hddtemp and UPS status")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Address on which to expose metrics and web interface
    #[arg(long = "web.listen-address", default_value = DEFAULT_LISTEN_ADDRESS)]
    listen_address: String,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", default_value = DEFAULT_METRICS_PATH)]
    metrics_path: String,

    /// Address to fetch hdd metrics from
    #[arg(long = "hddtemp-address", default_value = DEFAULT_HDDTEMP_ADDRESS)]
    hddtemp_address: String,

    /// Root of the hwmon sysfs tree
    #[arg(long = "hwmon-path", default_value = DEFAULT_HWMON_PATH)]
    hwmon_path: PathBuf,

    /// Command used to query UPS status
    #[arg(long = "pwrstat-command", default_value = DEFAULT_PWRSTAT_COMMAND)]
    pwrstat_command: String,

    /// Shut the exporter down when the UPS cannot be queried
    #[arg(long = "ups.fatal-on-error")]
    ups_fatal_on_error: bool,

    /// Disable the hddtemp collector
    #[arg(long)]
    no_hddtemp: bool,

    /// Disable the chip sensor collector
    #[arg(long)]
    no_sensors: bool,

    /// Disable the UPS collector
    #[arg(long)]
    no_ups: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the exporter (default)
    Serve,

    /// Run one collection pass, print it and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,
}

impl Cli {
    fn log_level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else if self.verbose {
            Level::INFO
        } else {
            Level::WARN
        }
    }

    fn exporter_config(&self) -> ExporterConfig {
        ExporterConfig {
            web: WebConfig::new(&self.listen_address, &self.metrics_path),
            hddtemp_address: self.hddtemp_address.clone(),
            hwmon_path: self.hwmon_path.clone(),
            pwrstat_command: self.pwrstat_command.clone(),
            enable_hddtemp: !self.no_hddtemp,
            enable_sensors: !self.no_sensors,
            enable_ups: !self.no_ups,
            ups_failure_policy: if self.ups_fatal_on_error {
                FailurePolicy::Fatal
            } else {
                FailurePolicy::Degrade
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let config = cli.exporter_config();

    match &cli.command {
        Some(Commands::Snapshot(args)) => snapshot_command(&config, args).await,
        Some(Commands::Serve) | None => serve_command(&config).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(cli.log_level(), directives.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// `RUST_LOG`-style directives win; otherwise everything at `level` and above.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

async fn serve_command(config: &ExporterConfig) -> anyhow::Result<()> {
    config
        .web
        .validate()
        .context("Invalid web configuration")?;

    info!("Starting sensor exporter {}", env!("CARGO_PKG_VERSION"));
    info!("  - Listen address: {}", config.web.listen_address);
    info!("  - Metrics path: {}", config.web.metrics_path);
    info!("  - hddtemp address: {}", config.hddtemp_address);
    info!("  - UPS failure policy: {:?}", config.ups_failure_policy);

    let orchestrator = config
        .build_orchestrator()
        .await
        .context("Failed to initialize collectors")?;

    start_web_server(&config.web, Arc::new(orchestrator)).await?;

    Ok(())
}

async fn snapshot_command(config: &ExporterConfig, args: &SnapshotArgs) -> anyhow::Result<()> {
    let orchestrator = config
        .build_orchestrator()
        .await
        .context("Failed to initialize collectors")?;

    match args.format.as_str() {
        "text" => {
            print!("{}", orchestrator.scrape().await?);
        }
        "json" => {
            let samples = orchestrator.collect().await?;
            println!("{}", serde_json::to_string_pretty(&samples)?);
        }
        other => {
            anyhow::bail!("Unsupported format: {}. Use 'text' or 'json'", other);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let cli = Cli::try_parse_from(["sensor_exporter"]).unwrap();
        let config = cli.exporter_config();
        assert_eq!(config.web.listen_address, ":9255");
        assert_eq!(config.web.metrics_path, "/metrics");
        assert_eq!(config.hddtemp_address, DEFAULT_HDDTEMP_ADDRESS);
        assert_eq!(config.ups_failure_policy, FailurePolicy::Degrade);
        assert!(config.enable_hddtemp && config.enable_sensors && config.enable_ups);
    }

    #[test]
    fn test_log_level_flags() {
        let level_of = |args: &[&str]| {
            let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
            log_filter(cli.log_level(), None).max_level_hint()
        };

        assert_eq!(level_of(&["sensor_exporter"]), Some(LevelFilter::WARN));
        assert_eq!(level_of(&["sensor_exporter", "-v"]), Some(LevelFilter::INFO));
        assert_eq!(level_of(&["sensor_exporter", "--debug"]), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_log_directives_override_flags() {
        let filter = log_filter(Level::WARN, Some("sensor_exporter=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));

        let filter = log_filter(Level::DEBUG, Some(""));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "sensor_exporter",
            "--web.listen-address",
            "127.0.0.1:9300",
            "--web.telemetry-path",
            "/probe",
            "--hddtemp-address",
            "localhost:7634",
            "--ups.fatal-on-error",
            "--no-sensors",
            "snapshot",
            "--format",
            "json",
        ])
        .unwrap();

        let config = cli.exporter_config();
        assert_eq!(config.web.listen_address, "127.0.0.1:9300");
        assert_eq!(config.web.metrics_path, "/probe");
        assert_eq!(config.hddtemp_address, "localhost:7634");
        assert_eq!(config.ups_failure_policy, FailurePolicy::Fatal);
        assert!(!config.enable_sensors);
        assert!(matches!(cli.command, Some(Commands::Snapshot(ref a)) if a.format == "json"));
    }
}
