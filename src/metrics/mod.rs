//! Hardware telemetry collection.
//!
//! Each collector translates one native source (hwmon chips, the hddtemp
//! daemon, the UPS) into [`Sample`]s described by the shared
//! [`DescriptorTable`]. The [`Orchestrator`] runs them all on every scrape.

pub mod collector;
pub mod descriptor;
pub mod exposition;
pub mod hddtemp;
pub mod sensors;
pub mod ups;

// Re-export commonly used items
pub use collector::{Collector, FailurePolicy, Orchestrator};
pub use descriptor::{DescriptorTable, MetricDescriptor, MetricId, MetricKind, Sample};
pub use hddtemp::{HddRecord, HddTempClient, HddTempCollector};
pub use sensors::{ChipReading, ChipSource, FeatureReading, SensorsCollector, SysfsChipSource};
pub use ups::{PwrstatSource, UpsCollector, UpsSource, UpsStatus};
