//! UPS status from CyberPower's `pwrstat` tool.

use crate::error::{ExporterError, Result};
use crate::metrics::collector::{Collector, FailurePolicy};
use crate::metrics::descriptor::{DescriptorTable, MetricDescriptor, MetricId, Sample};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// Status field holding the label value shared by every UPS sample.
pub const MODEL_NAME_FIELD: &str = "Model Name";

/// Named status fields reported by the UPS, values left as raw strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsStatus {
    fields: BTreeMap<String, String>,
}

impl UpsStatus {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    /// Parse `pwrstat -status` output.
    ///
    /// Field lines look like `\tModel Name................... CP1500PFCLCD`;
    /// section headers without a dotted leader are ignored.
    pub fn from_pwrstat_output(output: &str) -> Self {
        let fields = output
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                let leader = line.find("..")?;
                let key = line[..leader].trim();
                let value = line[leader..].trim_start_matches('.').trim();
                (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn model_name(&self) -> &str {
        self.get(MODEL_NAME_FIELD).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UpsStatus {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Queries the UPS for its current status.
#[async_trait]
pub trait UpsSource: Send + Sync {
    async fn query(&self) -> Result<UpsStatus>;
}

/// [`UpsSource`] that runs `pwrstat -status`.
#[derive(Debug, Clone)]
pub struct PwrstatSource {
    command: String,
}

impl PwrstatSource {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl UpsSource for PwrstatSource {
    async fn query(&self) -> Result<UpsStatus> {
        let output = Command::new(&self.command)
            .arg("-status")
            .output()
            .await
            .map_err(|e| ExporterError::query_error(&self.command, e.to_string()))?;

        if !output.status.success() {
            return Err(ExporterError::query_error(
                &self.command,
                format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(UpsStatus::from_pwrstat_output(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }
}

/// How a raw status value becomes a gauge value.
#[derive(Debug, Clone, Copy)]
enum Interpretation {
    /// First whitespace-delimited token as a float
    Number,
    /// 1 if the whole value equals the string, else 0
    Equals(&'static str),
    /// 1 if the first token equals the string, else 0
    FirstTokenEquals(&'static str),
}

impl Interpretation {
    fn apply(self, field: &str, raw: &str) -> Result<f64> {
        let first = raw.split_whitespace().next();
        match self {
            Self::Number => first
                .and_then(|token| token.parse::<f64>().ok())
                .ok_or_else(|| ExporterError::parse_error(field, raw)),
            Self::Equals(expected) => Ok(flag(raw == expected)),
            Self::FirstTokenEquals(expected) => Ok(flag(first == Some(expected))),
        }
    }
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

// `Utility Voltage` has a descriptor (`ups_in_voltage`) but is not emitted.
const UPS_FIELDS: [(&str, MetricId, Interpretation); 6] = [
    ("Load", MetricId::UpsLoad, Interpretation::Number),
    ("State", MetricId::UpsState, Interpretation::Equals("Normal")),
    ("Battery Capacity", MetricId::UpsBattery, Interpretation::Number),
    ("Remaining Runtime", MetricId::UpsRuntime, Interpretation::Number),
    ("Output Voltage", MetricId::UpsOutVoltage, Interpretation::Number),
    (
        "Test Result",
        MetricId::UpsTestResult,
        Interpretation::FirstTokenEquals("Passed"),
    ),
];

/// Exposes UPS load, state, battery and test results.
pub struct UpsCollector {
    source: Arc<dyn UpsSource>,
    descriptors: Arc<DescriptorTable>,
    policy: FailurePolicy,
}

impl UpsCollector {
    pub fn new(source: Arc<dyn UpsSource>, descriptors: Arc<DescriptorTable>) -> Self {
        Self {
            source,
            descriptors,
            policy: FailurePolicy::Degrade,
        }
    }

    /// Escalate query failures to process-fatal instead of degrading.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Interpret a status mapping. Fields that fail to parse are skipped.
    pub fn samples_from(&self, status: &UpsStatus) -> Result<Vec<Sample>> {
        let model = status.model_name();
        let mut samples = Vec::new();

        for (field, id, interpretation) in UPS_FIELDS {
            let Some(raw) = status.get(field) else {
                continue;
            };
            match interpretation.apply(field, raw) {
                Ok(value) => {
                    samples.push(self.descriptors.sample(id, value, vec![model.to_string()])?)
                }
                Err(e) => debug!(field, "Skipping UPS field: {}", e),
            }
        }

        Ok(samples)
    }
}

#[async_trait]
impl Collector for UpsCollector {
    fn name(&self) -> &'static str {
        "ups"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.descriptors.select(&[
            MetricId::UpsLoad,
            MetricId::UpsState,
            MetricId::UpsBattery,
            MetricId::UpsRuntime,
            MetricId::UpsInVoltage,
            MetricId::UpsOutVoltage,
            MetricId::UpsTestResult,
        ])
    }

    async fn collect(&self) -> Result<Vec<Sample>> {
        let status = self.source.query().await?;
        self.samples_from(&status)
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PWRSTAT_OUTPUT: &str = "
The UPS information shows as following:

\tProperties:
\t\tModel Name................... CP1500PFCLCD
\t\tFirmware Number.............. CR01505BBH1
\t\tRating Voltage............... 120 V
\t\tRating Power................. 900 Watt(1500 VA)

\tCurrent UPS status:
\t\tState........................ Normal
\t\tPower Supply by.............. Utility Power
\t\tUtility Voltage.............. 121 V
\t\tOutput Voltage............... 121 V
\t\tBattery Capacity............. 100 %
\t\tRemaining Runtime............ 42 min.
\t\tLoad......................... 126 Watt(14 %)
\t\tLine Interaction............. None
\t\tTest Result.................. Passed at 2024/01/07 03:00:12
\t\tLast Power Event............. Blackout at 2023/12/29 18:41:05 for 5 sec.
";

    fn collector() -> UpsCollector {
        struct Unused;

        #[async_trait]
        impl UpsSource for Unused {
            async fn query(&self) -> Result<UpsStatus> {
                Err(ExporterError::query_error("unused", "not queried"))
            }
        }

        UpsCollector::new(Arc::new(Unused), Arc::new(DescriptorTable::new()))
    }

    fn value_of(samples: &[Sample], name: &str) -> Option<f64> {
        samples.iter().find(|s| s.name() == name).map(|s| s.value())
    }

    #[test]
    fn test_parse_pwrstat_output() {
        let status = UpsStatus::from_pwrstat_output(PWRSTAT_OUTPUT);
        assert_eq!(status.model_name(), "CP1500PFCLCD");
        assert_eq!(status.get("Load"), Some("126 Watt(14 %)"));
        assert_eq!(status.get("Remaining Runtime"), Some("42 min."));
        assert_eq!(status.get("Properties:"), None);
        assert_eq!(status.len(), 14);
    }

    #[test]
    fn test_interpret_full_status() {
        let status = UpsStatus::from_pwrstat_output(PWRSTAT_OUTPUT);
        let samples = collector().samples_from(&status).unwrap();

        assert_eq!(samples.len(), 6);
        assert!(samples.iter().all(|s| s.label("device") == Some("CP1500PFCLCD")));
        assert_eq!(value_of(&samples, "ups_load"), Some(126.0));
        assert_eq!(value_of(&samples, "ups_state"), Some(1.0));
        assert_eq!(value_of(&samples, "ups_battery_capacity"), Some(100.0));
        assert_eq!(value_of(&samples, "ups_remaining_runtime"), Some(42.0));
        assert_eq!(value_of(&samples, "ups_out_voltage"), Some(121.0));
        assert_eq!(value_of(&samples, "ups_test_result"), Some(1.0));
        assert_eq!(value_of(&samples, "ups_in_voltage"), None);
    }

    #[test]
    fn test_state_other_than_normal() {
        let status: UpsStatus = [("Model Name", "X"), ("State", "Fault")].into_iter().collect();
        let samples = collector().samples_from(&status).unwrap();
        assert_eq!(value_of(&samples, "ups_state"), Some(0.0));

        let status: UpsStatus = [("State", "Normal")].into_iter().collect();
        let samples = collector().samples_from(&status).unwrap();
        assert_eq!(value_of(&samples, "ups_state"), Some(1.0));
        assert_eq!(samples[0].label("device"), Some(""));
    }

    #[test]
    fn test_unparseable_field_is_skipped() {
        let status: UpsStatus = [
            ("Model Name", "X"),
            ("Load", "unknown"),
            ("Battery Capacity", ""),
            ("Remaining Runtime", "12 min."),
            ("Test Result", "Failed at 2024/01/07"),
        ]
        .into_iter()
        .collect();

        let samples = collector().samples_from(&status).unwrap();
        assert_eq!(value_of(&samples, "ups_load"), None);
        assert_eq!(value_of(&samples, "ups_battery_capacity"), None);
        assert_eq!(value_of(&samples, "ups_remaining_runtime"), Some(12.0));
        assert_eq!(value_of(&samples, "ups_test_result"), Some(0.0));
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let err = collector().collect().await.unwrap_err();
        assert!(matches!(err, ExporterError::Query { .. }));
    }

    #[tokio::test]
    async fn test_missing_pwrstat_binary() {
        let source = PwrstatSource::new("/nonexistent/pwrstat");
        let err = source.query().await.unwrap_err();
        assert!(matches!(err, ExporterError::Query { .. }));
    }

    #[test]
    fn test_describe_includes_input_voltage() {
        let names: Vec<String> = collector().describe().iter().map(|d| d.name.clone()).collect();
        assert!(names.contains(&"ups_in_voltage".to_string()));
        assert_eq!(collector().failure_policy(), FailurePolicy::Degrade);
        assert_eq!(
            collector()
                .with_failure_policy(FailurePolicy::Fatal)
                .failure_policy(),
            FailurePolicy::Fatal
        );
    }
}
