//! Chip sensor readings (fans, temperatures, voltages, power).
//!
//! Readings come from the kernel's hwmon sysfs tree, the same interface the
//! lm-sensors library reads. Every `hwmonN` directory is a chip and every
//! `<feature>_input` file in it is a feature with a value already in
//! kernel units (millidegrees, millivolts, microwatts, RPM).

use crate::error::{ExporterError, Result};
use crate::metrics::collector::Collector;
use crate::metrics::descriptor::{DescriptorTable, MetricDescriptor, MetricId, Sample};
use async_trait::async_trait;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Feature-name prefixes and the metric they map to, checked in order.
pub const FEATURE_CLASSES: [(&str, MetricId); 4] = [
    ("fan", MetricId::FanSpeed),
    ("temp", MetricId::Temperature),
    ("in", MetricId::Voltage),
    ("power", MetricId::Power),
];

/// Map a feature name to its metric; `None` for features this exporter ignores.
pub fn classify(feature_name: &str) -> Option<MetricId> {
    FEATURE_CLASSES
        .iter()
        .find(|(prefix, _)| feature_name.starts_with(prefix))
        .map(|(_, id)| *id)
}

/// One feature reading, scaled to base units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureReading {
    /// Kernel feature name, e.g. `fan1` or `temp2`
    pub name: String,
    /// Human label, e.g. `Core 0`; the feature name when the chip has none
    pub label: String,
    pub value: f64,
}

/// A detected chip and its current feature readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChipReading {
    /// Chip identifier, e.g. `coretemp-hwmon1`
    pub chip: String,
    /// Bus adapter description, e.g. `ISA adapter`
    pub adapter: String,
    pub features: Vec<FeatureReading>,
}

/// Enumerates detected chips along with their feature values.
///
/// Implementations may block; callers run them off the async executor.
pub trait ChipSource: Send + Sync {
    fn detected_chips(&self) -> Result<Vec<ChipReading>>;
}

/// [`ChipSource`] backed by `/sys/class/hwmon`.
#[derive(Debug, Clone)]
pub struct SysfsChipSource {
    root: PathBuf,
}

impl SysfsChipSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_chip(&self, hwmon_dir: &Path) -> Option<ChipReading> {
        let dir_name = hwmon_dir.file_name()?.to_string_lossy().into_owned();

        // Older drivers keep their attributes under `device/`.
        let attr_dir = [hwmon_dir.to_path_buf(), hwmon_dir.join("device")]
            .into_iter()
            .find(|dir| dir.join("name").is_file())?;
        let name = read_trimmed(&attr_dir.join("name"))?;

        let mut features = Vec::new();
        for entry in fs::read_dir(&attr_dir).ok()?.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(feature) = file_name.strip_suffix("_input") else {
                continue;
            };

            let raw = match read_trimmed(&entry.path()).map(|s| s.parse::<f64>()) {
                Some(Ok(raw)) => raw,
                _ => {
                    debug!(chip = %name, feature, "Skipping unreadable feature");
                    continue;
                }
            };

            let label = read_trimmed(&attr_dir.join(format!("{}_label", feature)))
                .unwrap_or_else(|| feature.to_string());

            features.push(FeatureReading {
                name: feature.to_string(),
                label,
                value: raw / unit_divisor(feature),
            });
        }
        features.sort_by(|a, b| a.name.cmp(&b.name));

        Some(ChipReading {
            chip: format!("{}-{}", name, dir_name),
            adapter: adapter_name(hwmon_dir),
            features,
        })
    }
}

impl ChipSource for SysfsChipSource {
    fn detected_chips(&self) -> Result<Vec<ChipReading>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            ExporterError::query_error("hwmon", format!("{}: {}", self.root.display(), e))
        })?;

        let mut dirs: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        dirs.sort();

        Ok(dirs.iter().filter_map(|dir| self.read_chip(dir)).collect())
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn unit_divisor(feature: &str) -> f64 {
    if feature.starts_with("temp")
        || feature.starts_with("in")
        || feature.starts_with("curr")
        || feature.starts_with("humidity")
    {
        1_000.0
    } else if feature.starts_with("power") || feature.starts_with("energy") {
        1_000_000.0
    } else {
        1.0
    }
}

/// Describe the bus a chip hangs off, in the wording lm-sensors uses.
fn adapter_name(hwmon_dir: &Path) -> String {
    let subsystem = fs::read_link(hwmon_dir.join("device").join("subsystem"))
        .ok()
        .and_then(|link| link.file_name().map(|n| n.to_string_lossy().into_owned()));

    match subsystem.as_deref() {
        None => "Virtual device",
        Some("platform") | Some("isa") => "ISA adapter",
        Some("pci") => "PCI adapter",
        Some("i2c") => "I2C adapter",
        Some("spi") => "SPI adapter",
        Some("acpi") => "ACPI interface",
        Some("hid") => "HID adapter",
        Some("scsi") => "SCSI adapter",
        Some("mdio_bus") => "MDIO adapter",
        Some(_) => "Unknown adapter",
    }
    .to_string()
}

/// Exposes chip sensor readings, one family per physical quantity.
pub struct SensorsCollector {
    source: Arc<dyn ChipSource>,
    descriptors: Arc<DescriptorTable>,
}

impl SensorsCollector {
    /// Create the collector, enumerating chips once up front.
    ///
    /// An enumeration failure here is returned to the caller: without chips
    /// the collector would never produce data.
    pub fn new(source: Arc<dyn ChipSource>, descriptors: Arc<DescriptorTable>) -> Result<Self> {
        let chips = source.detected_chips()?;
        if chips.is_empty() {
            warn!("No sensor chips detected");
        } else {
            info!(
                chips = chips.len(),
                features = chips.iter().map(|c| c.features.len()).sum::<usize>(),
                "Detected sensor chips"
            );
        }
        Ok(Self {
            source,
            descriptors,
        })
    }

    /// Turn chip readings into samples.
    pub fn samples_from(&self, chips: Vec<ChipReading>) -> Result<Vec<Sample>> {
        let mut samples = Vec::new();
        for chip in chips {
            for feature in chip.features {
                let Some(id) = classify(&feature.name) else {
                    continue;
                };
                samples.push(self.descriptors.sample(
                    id,
                    feature.value,
                    vec![feature.label, chip.chip.clone(), chip.adapter.clone()],
                )?);
            }
        }
        Ok(samples)
    }
}

#[async_trait]
impl Collector for SensorsCollector {
    fn name(&self) -> &'static str {
        "sensors"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        let ids: Vec<MetricId> = FEATURE_CLASSES.iter().map(|(_, id)| *id).collect();
        self.descriptors.select(&ids)
    }

    async fn collect(&self) -> Result<Vec<Sample>> {
        let source = Arc::clone(&self.source);
        let chips = tokio::task::spawn_blocking(move || source.detected_chips())
            .await
            .map_err(|e| ExporterError::query_error("hwmon", e.to_string()))??;
        self.samples_from(chips)
    }
}
