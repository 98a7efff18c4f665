//! Gearman metric collector.
//!
//! Maps `version` and `status` responses onto a fixed gauge schema:
//!
//! | Metric | Labels | Value |
//! |---|---|---|
//! | `gearman_up` | | 1 if `version` succeeded, else 0 |
//! | `gearman_version_info` | `version` | always 1 |
//! | `gearman_jobs` | `function` | queued + running |
//! | `gearman_jobs_running` | `function` | running |
//! | `gearman_jobs_waiting` | `function` | queued, not running |
//! | `gearman_workers` | `function` | capable workers |

use crate::collector::{Collector, MetricDesc, MetricSink};
use crate::gearman::{GearmanClient, GearmanError, StatusSnapshot};

/// Prefix of every exported metric name.
pub const METRICS_NAMESPACE: &str = "gearman";

/// Version label value used when the version query fails.
const UNKNOWN_VERSION: &str = "unknown";

/// Polls a gearman server and emits gauges on every scrape.
///
/// Holds the client configuration and static descriptors only, so concurrent
/// scrapes never share mutable state.
#[derive(Debug, Clone)]
pub struct GearmanCollector {
    client: GearmanClient,
    up: MetricDesc,
    version_info: MetricDesc,
    jobs: MetricDesc,
    jobs_running: MetricDesc,
    jobs_waiting: MetricDesc,
    workers: MetricDesc,
}

fn function_metric(name: &str, help: &'static str) -> MetricDesc {
    MetricDesc::new(METRICS_NAMESPACE, name, help, &["function"])
}

impl GearmanCollector {
    pub fn new(client: GearmanClient) -> Self {
        Self {
            client,
            up: MetricDesc::new(METRICS_NAMESPACE, "up", "is gearman up", &[]),
            version_info: MetricDesc::new(
                METRICS_NAMESPACE,
                "version_info",
                "gearman version",
                &["version"],
            ),
            jobs: function_metric("jobs", "number of jobs queued or running"),
            jobs_running: function_metric("jobs_running", "number of running jobs"),
            jobs_waiting: function_metric(
                "jobs_waiting",
                "number of jobs waiting for an available worker",
            ),
            workers: function_metric("workers", "number of capable workers"),
        }
    }

    /// Query the version and emit `up` and `version_info`.
    pub async fn collect_version<S: MetricSink + ?Sized>(&self, sink: &mut S) {
        let result = self.client.get_version().await;
        self.record_version(result, sink);
    }

    /// Query the status and emit the per-function gauges.
    pub async fn collect_status<S: MetricSink + ?Sized>(&self, sink: &mut S) {
        let result = self.client.get_status().await;
        self.record_status(result, sink);
    }

    fn record_version<S: MetricSink + ?Sized>(
        &self,
        result: Result<String, GearmanError>,
        sink: &mut S,
    ) {
        let (up, version) = match result {
            Ok(version) => (1.0, version),
            Err(e) => {
                tracing::error!(
                    address = %self.client.address(),
                    error = %e,
                    "failed to get gearman version"
                );
                (0.0, UNKNOWN_VERSION.to_string())
            }
        };

        sink.emit(&self.up, up, &[]);
        sink.emit(&self.version_info, 1.0, &[version.as_str()]);
    }

    /// A failed status poll emits nothing, so the series disappear for this
    /// scrape instead of reporting a false zero.
    fn record_status<S: MetricSink + ?Sized>(
        &self,
        result: Result<StatusSnapshot, GearmanError>,
        sink: &mut S,
    ) {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(
                    address = %self.client.address(),
                    error = %e,
                    "failed to get gearman status"
                );
                return;
            }
        };

        for status in snapshot.iter() {
            let function = [status.name.as_str()];
            sink.emit(&self.jobs, status.total as f64, &function);
            sink.emit(&self.jobs_running, status.running as f64, &function);
            sink.emit(&self.jobs_waiting, status.waiting() as f64, &function);
            sink.emit(&self.workers, status.workers as f64, &function);
        }
    }
}

#[async_trait::async_trait]
impl Collector for GearmanCollector {
    fn describe(&self) -> Vec<MetricDesc> {
        vec![
            self.up.clone(),
            self.version_info.clone(),
            self.jobs.clone(),
            self.jobs_running.clone(),
            self.jobs_waiting.clone(),
            self.workers.clone(),
        ]
    }

    /// Both queries run concurrently; version samples are always emitted
    /// before status samples.
    async fn collect(&self, sink: &mut (dyn MetricSink + Send)) {
        let (version, status) = tokio::join!(self.client.get_version(), self.client.get_status());
        self.record_version(version, &mut *sink);
        self.record_status(status, &mut *sink);
    }
}
