//! Core collector traits and types.

use std::collections::BTreeMap;

/// Static description of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    /// Fully qualified metric name (namespace included).
    pub name: String,
    /// Help text.
    pub help: &'static str,
    /// Variable label names, in the order label values are passed to sinks.
    pub labels: &'static [&'static str],
}

impl MetricDesc {
    /// Create a descriptor named `<namespace>_<name>`.
    pub fn new(
        namespace: &str,
        name: &str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        let name = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}_{name}")
        };
        Self { name, help, labels }
    }
}

/// One emitted gauge value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Fully qualified metric name.
    pub name: String,
    /// Label name to value.
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl MetricSample {
    /// Label value by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Destination for samples produced during a single scrape.
///
/// `label_values` line up with [`MetricDesc::labels`].
pub trait MetricSink {
    fn emit(&mut self, desc: &MetricDesc, value: f64, label_values: &[&str]);
}

/// Recording sink, keeps samples in emission order.
impl MetricSink for Vec<MetricSample> {
    fn emit(&mut self, desc: &MetricDesc, value: f64, label_values: &[&str]) {
        let labels = desc
            .labels
            .iter()
            .zip(label_values)
            .map(|(name, v)| (name.to_string(), v.to_string()))
            .collect();

        self.push(MetricSample {
            name: desc.name.clone(),
            labels,
            value,
        });
    }
}

/// Scrape-time metric source.
///
/// # Error Handling Philosophy
///
/// `collect()` does not return errors. Upstream failures are observations:
/// they are logged and turned into `up = 0` or into absent series, so a
/// scrape always completes with a well-formed, possibly partial, result.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Every metric family this collector may emit.
    fn describe(&self) -> Vec<MetricDesc>;

    /// Poll the source once and write samples to `sink`.
    async fn collect(&self, sink: &mut (dyn MetricSink + Send));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_desc_namespace() {
        let desc = MetricDesc::new("gearman", "jobs", "number of jobs", &["function"]);
        assert_eq!(desc.name, "gearman_jobs");

        let bare = MetricDesc::new("", "up", "is it up", &[]);
        assert_eq!(bare.name, "up");
    }

    #[test]
    fn test_vec_sink_records_labels_in_order() {
        let jobs = MetricDesc::new("gearman", "jobs", "number of jobs", &["function"]);
        let up = MetricDesc::new("gearman", "up", "is gearman up", &[]);

        let mut samples: Vec<MetricSample> = Vec::new();
        samples.emit(&up, 1.0, &[]);
        samples.emit(&jobs, 5.0, &["send_email"]);

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].name, "gearman_up");
        assert!(samples[0].labels.is_empty());
        assert_eq!(samples[1].label("function"), Some("send_email"));
        assert_eq!(samples[1].value, 5.0);
    }
}
