use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use tracing::{debug, error};

use crate::error::Result;
use crate::model::{DashboardRef, Runtime};
use crate::resolver::TemplateResolver;
use crate::template::MonitoringDashboard;

/// Matches every visible template against the metric names reported for the workload.
///
/// `metric_names` runs alongside template loading. Template loading failures abort;
/// the metric-name future is expected to degrade to an empty list on its own.
pub async fn discover<F>(
    resolver: &TemplateResolver<'_>,
    namespace: &str,
    metric_names: F,
) -> Result<Vec<Runtime>>
where
    F: Future<Output = Vec<String>>,
{
    let (dashboards, metrics) = tokio::join!(resolver.load_all_raw(namespace), metric_names);
    let dashboards = dashboards.map_err(|e| {
        error!(
            "runtimes discovery failed, cannot load dashboards in namespace {}: {}",
            namespace, e
        );
        e
    })?;
    debug!(
        "matching {} dashboards against {} metrics in namespace {}",
        dashboards.len(),
        metrics.len(),
        namespace
    );
    Ok(run_discovery_matcher(&metrics, &dashboards))
}

/// Templates included by a matching template are never reported on their own.
pub fn run_discovery_matcher(
    metrics: &[String],
    dashboards: &BTreeMap<String, MonitoringDashboard>,
) -> Vec<Runtime> {
    let metrics: HashSet<&str> = metrics.iter().map(|m| m.trim()).collect();

    // None marks a template suppressed by an including one
    let mut matched: BTreeMap<&str, Option<&MonitoringDashboard>> = BTreeMap::new();
    for (name, dashboard) in dashboards {
        let discover_on = dashboard.spec.discover_on.trim();
        if discover_on.is_empty() || !metrics.contains(discover_on) {
            continue;
        }
        matched.entry(name.as_str()).or_insert(Some(dashboard));
        for item in &dashboard.spec.items {
            if let Some(reference) = item.include_ref() {
                matched.insert(reference.template, None);
            }
        }
    }

    let mut runtimes = Vec::new();
    for dashboard in matched.into_values().flatten() {
        add_dashboard_to_runtimes(dashboard, &mut runtimes);
    }
    runtimes.sort_by(|a, b| a.name.cmp(&b.name));
    runtimes
}

/// Loads the named templates concurrently and groups them by runtime, in input order.
pub async fn build_runtimes_list(
    resolver: &TemplateResolver<'_>,
    namespace: &str,
    templates: &[String],
) -> Vec<Runtime> {
    let loaded = join_all(templates.iter().map(|t| resolver.load_raw(namespace, t))).await;

    let mut runtimes = Vec::new();
    for (template, result) in templates.iter().zip(loaded) {
        match result {
            Ok(dashboard) => add_dashboard_to_runtimes(&dashboard, &mut runtimes),
            Err(e) => error!(
                "cannot get dashboard {} in namespace {}: {}",
                template, namespace, e
            ),
        }
    }
    runtimes
}

pub fn add_dashboard_to_runtimes(dashboard: &MonitoringDashboard, runtimes: &mut Vec<Runtime>) {
    let reference = DashboardRef {
        template: dashboard.name().to_string(),
        title: dashboard.spec.title.clone(),
    };
    match runtimes.iter_mut().find(|rt| rt.name == dashboard.spec.runtime) {
        Some(runtime) => runtime.dashboard_refs.push(reference),
        None => runtimes.push(Runtime {
            name: dashboard.spec.runtime.clone(),
            dashboard_refs: vec![reference],
        }),
    }
}
