//! Prometheus text exposition of collected samples.

use crate::error::{ExporterError, Result};
use crate::metrics::descriptor::Sample;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode one scrape's samples as Prometheus text.
///
/// A fresh registry is built per call, so concurrent scrapes never share
/// metric state. Families without samples are left out entirely.
pub fn encode_text(samples: &[Sample]) -> Result<String> {
    let registry = Registry::new();
    let mut families: BTreeMap<&str, GaugeVec> = BTreeMap::new();

    for sample in samples {
        let descriptor = sample.descriptor();
        if !families.contains_key(descriptor.name.as_str()) {
            let label_names: Vec<&str> =
                descriptor.label_names.iter().map(String::as_str).collect();
            let vec = GaugeVec::new(Opts::new(&descriptor.name, &descriptor.help), &label_names)
                .map_err(|e| ExporterError::encoding_error(e.to_string()))?;
            registry
                .register(Box::new(vec.clone()))
                .map_err(|e| ExporterError::encoding_error(e.to_string()))?;
            families.insert(descriptor.name.as_str(), vec);
        }
        let gauge = &families[descriptor.name.as_str()];

        let label_values: Vec<&str> = sample.label_values().iter().map(String::as_str).collect();
        gauge
            .get_metric_with_label_values(&label_values)
            .map_err(|e| ExporterError::encoding_error(e.to_string()))?
            .set(sample.value());
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| ExporterError::encoding_error(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ExporterError::encoding_error(e.to_string()))
}
