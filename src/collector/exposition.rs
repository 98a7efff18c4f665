//! Prometheus text exposition.
//!
//! A fresh [`Registry`] is built for every scrape, so gauges never carry a
//! value over from a previous poll.

use std::collections::HashMap;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::collector::{Collector, MetricDesc, MetricSink};

/// Sink backed by a per-scrape Prometheus registry.
pub struct PrometheusSink {
    registry: Registry,
    gauges: HashMap<String, GaugeVec>,
}

impl PrometheusSink {
    /// Register one gauge family per descriptor.
    pub fn new(descs: &[MetricDesc]) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let mut gauges = HashMap::with_capacity(descs.len());

        for desc in descs {
            let gauge = GaugeVec::new(Opts::new(desc.name.clone(), desc.help), desc.labels)?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert(desc.name.clone(), gauge);
        }

        Ok(Self { registry, gauges })
    }

    /// Encode everything emitted so far. Families without samples are left
    /// out entirely.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusSink")
            .field("families", &self.gauges.len())
            .finish_non_exhaustive()
    }
}

impl MetricSink for PrometheusSink {
    fn emit(&mut self, desc: &MetricDesc, value: f64, label_values: &[&str]) {
        let Some(gauge) = self.gauges.get(&desc.name) else {
            tracing::warn!(metric = %desc.name, "Sample for undescribed metric dropped");
            return;
        };

        match gauge.get_metric_with_label_values(label_values) {
            Ok(g) => g.set(value),
            Err(e) => tracing::warn!(metric = %desc.name, error = %e, "Sample dropped"),
        }
    }
}

/// Run one collection and return the rendered exposition text.
pub async fn scrape(collector: &dyn Collector) -> Result<String, prometheus::Error> {
    let mut sink = PrometheusSink::new(&collector.describe())?;
    collector.collect(&mut sink).await;
    sink.render()
}
