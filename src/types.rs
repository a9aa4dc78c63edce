use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Aggregation;

pub const DEFAULT_NAMESPACE_LABEL: &str = "namespace";

#[derive(Debug, Clone)]
pub struct Config {
    pub global_namespace: Option<String>,
    pub namespace_label: String,
    pub prometheus: PrometheusConfig,
    pub grafana: GrafanaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global_namespace: None,
            namespace_label: DEFAULT_NAMESPACE_LABEL.to_string(),
            prometheus: PrometheusConfig::default(),
            grafana: GrafanaConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrometheusConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: "http://prometheus:9090".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrafanaConfig {
    pub enabled: bool,
    /// Browser-facing URL, used to build links.
    pub url: Option<String>,
    /// URL used for API calls when Grafana is reachable in-cluster under another address.
    pub in_cluster_url: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            in_cluster_url: None,
            token: None,
            timeout_seconds: 10,
        }
    }
}

impl GrafanaConfig {
    pub fn api_url(&self) -> Option<&str> {
        self.in_cluster_url.as_deref().or(self.url.as_deref())
    }
}

/// Time window and PromQL knobs shared by every chart query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub step_seconds: Option<i64>,
    #[serde(default = "default_rate_interval")]
    pub rate_interval: String,
    #[serde(default = "default_rate_func")]
    pub rate_func: String,
    #[serde(default)]
    pub quantiles: Vec<String>,
    #[serde(default = "default_avg")]
    pub avg: bool,
}

fn default_rate_interval() -> String {
    "1m".to_string()
}

fn default_rate_func() -> String {
    "rate".to_string()
}

fn default_avg() -> bool {
    true
}

impl Default for MetricsQuery {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            step_seconds: None,
            rate_interval: default_rate_interval(),
            rate_func: default_rate_func(),
            quantiles: Vec::new(),
            avg: default_avg(),
        }
    }
}

impl MetricsQuery {
    pub fn fill_defaults(&mut self) {
        let end = *self.end.get_or_insert_with(Utc::now);
        self.start.get_or_insert(end - Duration::minutes(30));
        self.step_seconds.get_or_insert(15);
        if self.rate_interval.is_empty() {
            self.rate_interval = default_rate_interval();
        }
        if self.rate_func.is_empty() {
            self.rate_func = default_rate_func();
        }
    }

    /// Copy with the time window fixed, for issuing several queries over one range.
    pub fn pinned(&self) -> Self {
        let mut query = self.clone();
        query.fill_defaults();
        query
    }

    /// Resolved `(start, end, step)`; defaults apply to any missing field.
    ///
    /// An unset `end` reads the clock on every call. Use [`MetricsQuery::pinned`]
    /// or [`MetricsQuery::fill_defaults`] before issuing several related queries.
    pub fn range(&self) -> (DateTime<Utc>, DateTime<Utc>, i64) {
        let end = self.end.unwrap_or_else(Utc::now);
        let start = self.start.unwrap_or(end - Duration::minutes(30));
        (start, end, self.step_seconds.unwrap_or(15))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub namespace: String,
    #[serde(default)]
    pub labels_filters: BTreeMap<String, String>,
    #[serde(default)]
    pub additional_labels: Vec<Aggregation>,
    #[serde(default)]
    pub by_labels: Vec<String>,
    #[serde(default = "default_raw_aggregator")]
    pub raw_data_aggregator: String,
    #[serde(flatten)]
    pub metrics_query: MetricsQuery,
}

fn default_raw_aggregator() -> String {
    "sum".to_string()
}

impl DashboardQuery {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            labels_filters: BTreeMap::new(),
            additional_labels: Vec::new(),
            by_labels: Vec::new(),
            raw_data_aggregator: default_raw_aggregator(),
            metrics_query: MetricsQuery::default(),
        }
    }

    pub fn with_filter(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels_filters.insert(label.into(), value.into());
        self
    }

    pub fn fill_defaults(&mut self) {
        if self.raw_data_aggregator.is_empty() {
            self.raw_data_aggregator = default_raw_aggregator();
        }
        self.metrics_query.fill_defaults();
    }
}
