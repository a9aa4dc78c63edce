// Metrics backend access
pub mod prometheus;
pub mod query;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::Matrix;
use crate::types::MetricsQuery;

pub use prometheus::PrometheusClient;

/// Range queries against a Prometheus-compatible backend.
///
/// `selector` is a `{label="value",...}` string, `grouping` a comma-separated
/// label list (possibly empty).
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    async fn query_range(
        &self,
        metric: &str,
        selector: &str,
        grouping: &str,
        aggregator: &str,
        query: &MetricsQuery,
    ) -> Result<Matrix>;

    async fn query_rate_range(
        &self,
        metric: &str,
        selector: &str,
        grouping: &str,
        query: &MetricsQuery,
    ) -> Result<Matrix>;

    /// One matrix per statistic: each requested quantile, plus `avg` when asked for.
    async fn query_histogram_range(
        &self,
        metric: &str,
        selector: &str,
        grouping: &str,
        query: &MetricsQuery,
    ) -> Result<BTreeMap<String, Matrix>>;

    async fn list_metric_names(&self, selectors: &[String]) -> Result<Vec<String>>;
}
