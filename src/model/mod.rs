//! Output shapes handed to the presentation layer.

pub mod conversion;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::template::{MonitoringDashboardChart, MonitoringDashboardMetric};

pub use conversion::{convert_matrix, ConversionParams};

/// One time series as returned by the metrics backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStream {
    pub metric: BTreeMap<String, String>,
    /// `(unix seconds, value)` pairs.
    pub values: Vec<(f64, f64)>,
}

pub type Matrix = Vec<SampleStream>;

/// A converted series attached to a chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub datapoints: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub label: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLink {
    pub url: String,
    pub name: String,
    pub variables: crate::template::ExternalLinkVariables,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub name: String,
    pub unit: String,
    pub spans: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
    pub metrics: Vec<Series>,
    pub histogram: BTreeMap<String, Vec<Series>>,
    /// Set when one of the chart's queries failed; other data is still kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Chart {
    pub fn from_spec(chart: &MonitoringDashboardChart) -> Self {
        Self {
            name: chart.name.clone(),
            unit: chart.unit.clone(),
            spans: chart.spans,
            chart_type: chart.chart_type.clone(),
            min: chart.min,
            max: chart.max,
            ..Default::default()
        }
    }

    pub fn fill_metric<E: std::fmt::Display>(
        &mut self,
        reference: &MonitoringDashboardMetric,
        result: Result<Matrix, E>,
        params: &ConversionParams,
    ) {
        match result {
            Ok(matrix) => self
                .metrics
                .extend(convert_matrix(matrix, &reference.display_name, params)),
            Err(err) => self.push_error(&reference.metric_name, err),
        }
    }

    pub fn fill_histogram<E: std::fmt::Display>(
        &mut self,
        reference: &MonitoringDashboardMetric,
        result: Result<BTreeMap<String, Matrix>, E>,
        params: &ConversionParams,
    ) {
        match result {
            Ok(histogram) => {
                for (stat, matrix) in histogram {
                    self.histogram
                        .entry(stat)
                        .or_default()
                        .extend(convert_matrix(matrix, &reference.display_name, params));
                }
            }
            Err(err) => self.push_error(&reference.metric_name, err),
        }
    }

    fn push_error<E: std::fmt::Display>(&mut self, metric: &str, err: E) {
        let msg = format!("error fetching metric {}: {}", metric, err);
        self.error = Some(match self.error.take() {
            Some(prev) => format!("{}; {}", prev, msg),
            None => msg,
        });
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledDashboard {
    pub title: String,
    pub charts: Vec<Chart>,
    pub aggregations: Vec<Aggregation>,
    pub external_links: Vec<ExternalLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRef {
    pub template: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    pub name: String,
    pub dashboard_refs: Vec<DashboardRef>,
}

/// Aggregations declared by the charts, deduplicated by label, first declaration wins.
pub fn convert_aggregations<'a>(
    charts: impl IntoIterator<Item = &'a MonitoringDashboardChart>,
) -> Vec<Aggregation> {
    let mut seen = HashSet::new();
    let mut aggregations = Vec::new();
    for chart in charts {
        for agg in &chart.aggregations {
            if seen.insert(agg.label.clone()) {
                let display_name = if agg.display_name.is_empty() {
                    agg.label.clone()
                } else {
                    agg.display_name.clone()
                };
                aggregations.push(Aggregation {
                    label: agg.label.clone(),
                    display_name,
                });
            }
        }
    }
    aggregations
}
