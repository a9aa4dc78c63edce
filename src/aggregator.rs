use futures::future::join_all;
use tracing::{debug, error, warn};

use crate::labels::build_labels;
use crate::links::LinkResolver;
use crate::metrics::MetricsBackend;
use crate::model::{convert_aggregations, Chart, ConversionParams, ExternalLink, FilledDashboard};
use crate::template::{DataType, ExternalLinkSpec, MonitoringDashboardChart, ResolvedTemplate};
use crate::types::DashboardQuery;

/// Fills resolved templates with data from the metrics backend.
pub struct MetricsAggregator<'a> {
    backend: &'a dyn MetricsBackend,
    links: &'a dyn LinkResolver,
    namespace_label: &'a str,
}

impl<'a> MetricsAggregator<'a> {
    pub fn new(
        backend: &'a dyn MetricsBackend,
        links: &'a dyn LinkResolver,
        namespace_label: &'a str,
    ) -> Self {
        Self {
            backend,
            links,
            namespace_label,
        }
    }

    /// Charts are filled concurrently; a failing query only marks its own chart.
    pub async fn fill(&self, template: &ResolvedTemplate, query: &DashboardQuery) -> FilledDashboard {
        let selector = build_labels(self.namespace_label, &query.namespace, &query.labels_filters);

        let charts = join_all(
            template
                .charts
                .iter()
                .map(|chart| self.fill_chart(chart, &selector, query)),
        );
        let links = self.fetch_links(&template.external_links);
        let (charts, external_links) = tokio::join!(charts, links);

        let mut aggregations = query.additional_labels.clone();
        for agg in convert_aggregations(&template.charts) {
            if !aggregations.iter().any(|a| a.label == agg.label) {
                aggregations.push(agg);
            }
        }

        FilledDashboard {
            title: template.title.clone(),
            charts,
            aggregations,
            external_links,
        }
    }

    async fn fill_chart(
        &self,
        chart: &MonitoringDashboardChart,
        selector: &str,
        query: &DashboardQuery,
    ) -> Chart {
        let (grouping, params) = chart_grouping(chart, &query.by_labels);
        let mut filled = Chart::from_spec(chart);

        for reference in chart.get_metrics() {
            let metric = reference.metric_name.as_str();
            match chart.data_type {
                DataType::Raw => {
                    let aggregator = if chart.aggregator.is_empty() {
                        query.raw_data_aggregator.as_str()
                    } else {
                        chart.aggregator.as_str()
                    };
                    let result = self
                        .backend
                        .query_range(metric, selector, &grouping, aggregator, &query.metrics_query)
                        .await;
                    filled.fill_metric(&reference, result, &params);
                }
                DataType::Rate => {
                    let result = self
                        .backend
                        .query_rate_range(metric, selector, &grouping, &query.metrics_query)
                        .await;
                    filled.fill_metric(&reference, result, &params);
                }
                DataType::Histogram => {
                    let result = self
                        .backend
                        .query_histogram_range(metric, selector, &grouping, &query.metrics_query)
                        .await;
                    filled.fill_histogram(&reference, result, &params);
                }
            }
        }

        if let Some(err) = &filled.error {
            warn!("chart '{}' partially filled: {}", chart.name, err);
        }
        filled
    }

    async fn fetch_links(&self, specs: &[ExternalLinkSpec]) -> Vec<ExternalLink> {
        if specs.is_empty() {
            return Vec::new();
        }
        match self.links.resolve_links(specs).await {
            Ok(links) => links,
            Err(e) => {
                error!("Error while getting external links: {}", e);
                Vec::new()
            }
        }
    }
}

/// Group-by labels for a chart (its own, then the caller's) and the matching conversion parameters.
///
/// A sort label not requested anywhere is still grouped on, and flagged for removal
/// from the converted series.
pub fn chart_grouping(chart: &MonitoringDashboardChart, by_labels: &[String]) -> (String, ConversionParams) {
    let mut params = ConversionParams {
        sort_label: chart.sort_label.clone(),
        sort_label_parse_as: chart.sort_label_parse_as.clone(),
        ..Default::default()
    };
    if chart.unit_scale != 0.0 {
        params.scale = chart.unit_scale;
    }

    let mut labels: Vec<&str> = chart
        .group_labels
        .iter()
        .chain(by_labels.iter())
        .map(String::as_str)
        .collect();
    if !chart.sort_label.is_empty() && !labels.contains(&chart.sort_label.as_str()) {
        labels.push(&chart.sort_label);
        params.remove_sort_label = true;
    }
    let grouping = labels.join(",");
    debug!("chart '{}' grouped by [{}]", chart.name, grouping);
    (grouping, params)
}
