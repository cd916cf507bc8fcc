//! Exporter-wide configuration and collector wiring.

use crate::error::Result;
use crate::metrics::{
    ChipSource, DescriptorTable, FailurePolicy, HddTempClient, HddTempCollector, Orchestrator,
    PwrstatSource, SensorsCollector, SysfsChipSource, UpsCollector, UpsSource,
};
use crate::web::WebConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Everything needed to assemble the collectors and the web server.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub web: WebConfig,
    /// `host:port` of the hddtemp daemon
    pub hddtemp_address: String,
    /// Root of the hwmon sysfs tree
    pub hwmon_path: PathBuf,
    /// Command used to query the UPS
    pub pwrstat_command: String,
    pub enable_hddtemp: bool,
    pub enable_sensors: bool,
    pub enable_ups: bool,
    /// Policy applied when the UPS query fails
    pub ups_failure_policy: FailurePolicy,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            hddtemp_address: crate::DEFAULT_HDDTEMP_ADDRESS.to_string(),
            hwmon_path: PathBuf::from(crate::DEFAULT_HWMON_PATH),
            pwrstat_command: crate::DEFAULT_PWRSTAT_COMMAND.to_string(),
            enable_hddtemp: true,
            enable_sensors: true,
            enable_ups: true,
            ups_failure_policy: FailurePolicy::Degrade,
        }
    }
}

impl ExporterConfig {
    /// Build the orchestrator with every enabled collector.
    ///
    /// Fails if chip enumeration fails; an unreachable hddtemp daemon is only logged.
    pub async fn build_orchestrator(&self) -> Result<Orchestrator> {
        let chips: Option<Arc<dyn ChipSource>> = self
            .enable_sensors
            .then(|| Arc::new(SysfsChipSource::new(&self.hwmon_path)) as Arc<dyn ChipSource>);
        let ups: Option<Arc<dyn UpsSource>> = self
            .enable_ups
            .then(|| Arc::new(PwrstatSource::new(&self.pwrstat_command)) as Arc<dyn UpsSource>);
        self.build_orchestrator_with(chips, ups).await
    }

    /// Build the orchestrator using the given chip and UPS sources.
    pub async fn build_orchestrator_with(
        &self,
        chips: Option<Arc<dyn ChipSource>>,
        ups: Option<Arc<dyn UpsSource>>,
    ) -> Result<Orchestrator> {
        let descriptors = Arc::new(DescriptorTable::new());
        let mut orchestrator = Orchestrator::new();

        if self.enable_hddtemp {
            let collector = HddTempCollector::new(
                HddTempClient::new(&self.hddtemp_address),
                Arc::clone(&descriptors),
            );
            collector.probe().await;
            orchestrator.register(Box::new(collector));
        }

        if let Some(source) = chips {
            orchestrator.register(Box::new(SensorsCollector::new(
                source,
                Arc::clone(&descriptors),
            )?));
        }

        if let Some(source) = ups {
            orchestrator.register(Box::new(
                UpsCollector::new(source, Arc::clone(&descriptors))
                    .with_failure_policy(self.ups_failure_policy),
            ));
        }

        info!(collectors = ?orchestrator.collector_names(), "Collectors ready");
        Ok(orchestrator)
    }
}
