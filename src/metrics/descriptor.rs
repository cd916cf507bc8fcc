//! Metric descriptors, samples and the immutable descriptor table.

use crate::error::{ExporterError, Result};
use serde::Serialize;
use std::sync::Arc;

/// Value semantics of a metric family. Every family this exporter serves is a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
}

/// Identifies one entry of the [`DescriptorTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricId {
    FanSpeed,
    Voltage,
    Power,
    Temperature,
    HddTemperature,
    UpsLoad,
    UpsState,
    UpsBattery,
    UpsRuntime,
    UpsInVoltage,
    UpsOutVoltage,
    UpsTestResult,
}

/// Static schema for a metric family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub kind: MetricKind,
}

impl MetricDescriptor {
    /// Create a gauge descriptor.
    pub fn gauge(name: &str, help: &str, label_names: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            kind: MetricKind::Gauge,
        }
    }
}

/// One observation for a single scrape.
///
/// Construction checks that the label values line up with the descriptor's
/// label names, so every `Sample` that exists is encodable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    descriptor: Arc<MetricDescriptor>,
    value: f64,
    label_values: Vec<String>,
}

impl Sample {
    /// Create a sample, failing if the label arity does not match the descriptor.
    pub fn new(
        descriptor: Arc<MetricDescriptor>,
        value: f64,
        label_values: Vec<String>,
    ) -> Result<Self> {
        if descriptor.label_names.len() != label_values.len() {
            return Err(ExporterError::LabelMismatch {
                metric: descriptor.name.clone(),
                expected: descriptor.label_names.len(),
                actual: label_values.len(),
            });
        }
        Ok(Self {
            descriptor,
            value,
            label_values,
        })
    }

    pub fn descriptor(&self) -> &Arc<MetricDescriptor> {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Look up a label value by label name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.descriptor
            .label_names
            .iter()
            .position(|l| l == name)
            .map(|idx| self.label_values[idx].as_str())
    }
}

const CHIP_HELP: [(MetricId, &str, &str, &str); 4] = [
    (
        MetricId::FanSpeed,
        "sensor_lm_fan_speed_rpm",
        "fan speed (rotations per minute).",
        "fantype",
    ),
    (
        MetricId::Voltage,
        "sensor_lm_voltage_volts",
        "voltage in volts",
        "intype",
    ),
    (
        MetricId::Power,
        "sensor_lm_power_watts",
        "power in watts",
        "powertype",
    ),
    (
        MetricId::Temperature,
        "sensor_lm_temperature_celsius",
        "temperature in celsius",
        "temptype",
    ),
];

const UPS_HELP: [(MetricId, &str, &str); 7] = [
    (MetricId::UpsLoad, "ups_load", "UPS power load (Watt)"),
    (
        MetricId::UpsState,
        "ups_state",
        "UPS status (1 -> Normal, 0 -> Not)",
    ),
    (
        MetricId::UpsBattery,
        "ups_battery_capacity",
        "UPS battery capacity(%)",
    ),
    (
        MetricId::UpsRuntime,
        "ups_remaining_runtime",
        "UPS Remaining Runtime(min)",
    ),
    (MetricId::UpsInVoltage, "ups_in_voltage", "UPS Input Voltage(V)"),
    (
        MetricId::UpsOutVoltage,
        "ups_out_voltage",
        "UPS Output Voltage(V)",
    ),
    (
        MetricId::UpsTestResult,
        "ups_test_result",
        "UPS Test Result (1 -> Passed, 0 -> Not)",
    ),
];

/// Immutable table of every metric family the exporter can serve.
///
/// Built once at startup and shared by reference; nothing mutates it afterwards,
/// so concurrent scrapes read it without synchronization.
#[derive(Debug)]
pub struct DescriptorTable {
    entries: Vec<(MetricId, Arc<MetricDescriptor>)>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(CHIP_HELP.len() + UPS_HELP.len() + 1);

        for (id, name, help, type_label) in CHIP_HELP {
            let desc = MetricDescriptor::gauge(name, help, &[type_label, "chip", "adaptor"]);
            entries.push((id, Arc::new(desc)));
        }

        entries.push((
            MetricId::HddTemperature,
            Arc::new(MetricDescriptor::gauge(
                "sensor_hddsmart_temperature_celsius",
                "temperature in celsius",
                &["device", "id"],
            )),
        ));

        for (id, name, help) in UPS_HELP {
            entries.push((id, Arc::new(MetricDescriptor::gauge(name, help, &["device"]))));
        }

        debug_assert!(entries
            .iter()
            .enumerate()
            .all(|(idx, (id, _))| *id as usize == idx));

        Self { entries }
    }

    /// Descriptor for the given metric.
    pub fn get(&self, id: MetricId) -> Arc<MetricDescriptor> {
        // Entries are pushed in `MetricId` declaration order.
        Arc::clone(&self.entries[id as usize].1)
    }

    /// Descriptors for several metrics, in the order given.
    pub fn select(&self, ids: &[MetricId]) -> Vec<Arc<MetricDescriptor>> {
        ids.iter().map(|id| self.get(*id)).collect()
    }

    /// Build a sample for the given metric.
    pub fn sample(&self, id: MetricId, value: f64, label_values: Vec<String>) -> Result<Sample> {
        Sample::new(self.get(id), value, label_values)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<MetricDescriptor>> {
        self.entries.iter().map(|(_, desc)| desc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_every_metric() {
        let table = DescriptorTable::new();
        assert_eq!(table.len(), 12);

        let hdd = table.get(MetricId::HddTemperature);
        assert_eq!(hdd.name, "sensor_hddsmart_temperature_celsius");
        assert_eq!(hdd.label_names, vec!["device", "id"]);

        let fan = table.get(MetricId::FanSpeed);
        assert_eq!(fan.label_names, vec!["fantype", "chip", "adaptor"]);
        assert_eq!(fan.kind, MetricKind::Gauge);
    }

    #[test]
    fn test_lookup_matches_id() {
        let table = DescriptorTable::new();
        assert_eq!(table.get(MetricId::Power).name, "sensor_lm_power_watts");
        assert_eq!(table.get(MetricId::UpsState).name, "ups_state");
        assert_eq!(table.get(MetricId::UpsTestResult).name, "ups_test_result");
    }

    #[test]
    fn test_input_voltage_is_declared() {
        let table = DescriptorTable::new();
        assert!(table.iter().any(|d| d.name == "ups_in_voltage"));
    }

    #[test]
    fn test_sample_label_arity() {
        let table = DescriptorTable::new();
        let ok = table.sample(MetricId::UpsLoad, 120.0, vec!["CP1500".to_string()]);
        assert!(ok.is_ok());

        let err = table
            .sample(MetricId::UpsLoad, 120.0, vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            ExporterError::LabelMismatch {
                expected: 1,
                actual: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_sample_label_lookup() {
        let table = DescriptorTable::new();
        let sample = table
            .sample(
                MetricId::HddTemperature,
                38.0,
                vec!["/dev/sda".to_string(), "WDC WD40".to_string()],
            )
            .unwrap();
        assert_eq!(sample.label("device"), Some("/dev/sda"));
        assert_eq!(sample.label("id"), Some("WDC WD40"));
        assert_eq!(sample.label("chip"), None);
    }
}
