//! Collector contract and the per-scrape orchestrator.

use crate::error::{ExporterError, Result};
use crate::metrics::descriptor::{MetricDescriptor, Sample};
use crate::metrics::exposition;
use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, error};

/// What the orchestrator does when a collector fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the error and contribute no samples this pass.
    #[default]
    Degrade,
    /// Log the error and escalate it so the server shuts down.
    Fatal,
}

/// A source of samples for one hardware domain.
///
/// Implementations hold only their own state; a single instance serves every
/// concurrent scrape.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Descriptors of every family this collector can emit.
    fn describe(&self) -> Vec<Arc<MetricDescriptor>>;

    /// Gather this collector's samples for one scrape.
    async fn collect(&self) -> Result<Vec<Sample>>;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Degrade
    }
}

/// Runs every registered collector on each scrape and merges the results.
#[derive(Default)]
pub struct Orchestrator {
    collectors: Vec<Box<dyn Collector>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) {
        debug!(
            collector = collector.name(),
            families = collector.describe().len(),
            "Registered collector"
        );
        self.collectors.push(collector);
    }

    pub fn with_collector(mut self, collector: impl Collector + 'static) -> Self {
        self.register(Box::new(collector));
        self
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Descriptors of every registered collector.
    pub fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.collectors.iter().flat_map(|c| c.describe()).collect()
    }

    /// Run one collection pass.
    ///
    /// All collectors run to completion regardless of each other's outcome. A
    /// failing collector contributes zero samples; if its policy is
    /// [`FailurePolicy::Fatal`] the pass returns [`ExporterError::Fatal`] once
    /// every collector has finished.
    pub async fn collect(&self) -> Result<Vec<Sample>> {
        let results = join_all(
            self.collectors
                .iter()
                .map(|c| async move { (c, c.collect().await) }),
        )
        .await;

        let mut samples = Vec::new();
        let mut fatal = None;

        for (collector, result) in results {
            match result {
                Ok(collected) => {
                    debug!(
                        collector = collector.name(),
                        samples = collected.len(),
                        "Collected samples"
                    );
                    samples.extend(collected);
                }
                Err(e) => {
                    error!(
                        collector = collector.name(),
                        policy = ?collector.failure_policy(),
                        "Collection failed, emitting no samples: {}",
                        e
                    );
                    if collector.failure_policy() == FailurePolicy::Fatal && fatal.is_none() {
                        fatal = Some(ExporterError::Fatal {
                            collector: collector.name().to_string(),
                            source: Box::new(e),
                        });
                    }
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(samples),
        }
    }

    /// Run one collection pass and encode it in the Prometheus text format.
    pub async fn scrape(&self) -> Result<String> {
        let samples = self.collect().await?;
        exposition::encode_text(&samples)
    }
}
