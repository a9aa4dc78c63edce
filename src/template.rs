//! `MonitoringDashboard` custom resource (`monitoring.kiali.io/v1alpha1`).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

pub const API_GROUP: &str = "monitoring.kiali.io";
pub const API_VERSION: &str = "v1alpha1";
pub const PLURAL: &str = "monitoringdashboards";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringDashboard {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: MonitoringDashboardSpec,
}

impl MonitoringDashboard {
    pub fn new(name: impl Into<String>, spec: MonitoringDashboardSpec) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..ObjectMeta::default()
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringDashboardSpec {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub discover_on: String,
    #[serde(default)]
    pub items: Vec<MonitoringDashboardItem>,
    #[serde(default)]
    pub external_links: Vec<ExternalLinkSpec>,
}

/// Either an include reference or an inline chart; a non-blank `include` wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringDashboardItem {
    #[serde(default)]
    pub include: String,
    #[serde(default)]
    pub chart: MonitoringDashboardChart,
}

impl MonitoringDashboardItem {
    pub fn chart(chart: MonitoringDashboardChart) -> Self {
        Self {
            include: String::new(),
            chart,
        }
    }

    pub fn include(reference: impl Into<String>) -> Self {
        Self {
            include: reference.into(),
            chart: MonitoringDashboardChart::default(),
        }
    }

    pub fn include_ref(&self) -> Option<IncludeRef<'_>> {
        IncludeRef::parse(&self.include)
    }
}

/// Parsed `template` or `template$chart` reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeRef<'a> {
    pub template: &'a str,
    pub chart: Option<&'a str>,
}

impl<'a> IncludeRef<'a> {
    pub fn parse(reference: &'a str) -> Option<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        let mut parts = reference.splitn(2, '$');
        let template = parts.next().unwrap_or_default();
        Some(Self {
            template,
            chart: parts.next(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Raw,
    Rate,
    Histogram,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringDashboardChart {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub unit_scale: f64,
    #[serde(default)]
    pub spans: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i32>,
    /// Legacy single-metric form, used when `metrics` is empty.
    #[serde(default)]
    pub metric_name: String,
    #[serde(default)]
    pub metrics: Vec<MonitoringDashboardMetric>,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub aggregator: String,
    #[serde(default)]
    pub aggregations: Vec<MonitoringDashboardAggregation>,
    #[serde(default)]
    pub group_labels: Vec<String>,
    #[serde(default)]
    pub sort_label: String,
    #[serde(default)]
    pub sort_label_parse_as: String,
}

impl MonitoringDashboardChart {
    pub fn get_metrics(&self) -> Vec<MonitoringDashboardMetric> {
        if !self.metrics.is_empty() {
            return self.metrics.clone();
        }
        if self.metric_name.is_empty() {
            return Vec::new();
        }
        vec![MonitoringDashboardMetric {
            metric_name: self.metric_name.clone(),
            display_name: self.name.clone(),
        }]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringDashboardMetric {
    pub metric_name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringDashboardAggregation {
    pub label: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLinkSpec {
    #[serde(rename = "type", default)]
    pub link_type: String,
    pub name: String,
    #[serde(default)]
    pub variables: ExternalLinkVariables,
}

/// Names of the dashboard variables a link target expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLinkVariables {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
}

/// A template whose items are all inline charts.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTemplate {
    pub name: String,
    pub title: String,
    pub runtime: String,
    pub charts: Vec<MonitoringDashboardChart>,
    pub external_links: Vec<ExternalLinkSpec>,
}

#[derive(Debug, Deserialize)]
pub struct MonitoringDashboardList {
    #[serde(default)]
    pub items: Vec<MonitoringDashboard>,
}
