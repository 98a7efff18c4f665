//! Collector Layer
//!
//! Translates upstream state into gauge samples on every scrape. Nothing is
//! cached between scrapes: a failed poll yields missing series, never stale
//! ones.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for a scrape-time metric source
//! - [`MetricSink`]: Destination for samples emitted during one scrape
//! - [`GearmanCollector`]: Gearman `version` + `status` translation
//! - [`PrometheusSink`]: Renders samples in the Prometheus text format
//!
//! # Example
//!
//! ```rust,no_run
//! use gearman_exporter::{GearmanClient, GearmanCollector, GearmanConfig, MetricSample};
//! use gearman_exporter::collector::Collector;
//!
//! # async fn run() {
//! let client = GearmanClient::new(GearmanConfig::new("127.0.0.1:4730"));
//! let collector = GearmanCollector::new(client);
//!
//! let mut samples: Vec<MetricSample> = Vec::new();
//! collector.collect(&mut samples).await;
//! # }
//! ```

mod exposition;
mod gearman;
mod traits;

pub use exposition::{PrometheusSink, scrape};
pub use gearman::{GearmanCollector, METRICS_NAMESPACE};
pub use traits::{Collector, MetricDesc, MetricSample, MetricSink};
