use futures::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::kubernetes::TemplateStore;
use crate::template::{MonitoringDashboard, ResolvedTemplate};

/// Loads templates with namespace override / global fallback and expands includes.
pub struct TemplateResolver<'a> {
    store: &'a dyn TemplateStore,
    global_namespace: Option<&'a str>,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(store: &'a dyn TemplateStore, global_namespace: Option<&'a str>) -> Self {
        Self {
            store,
            global_namespace: global_namespace.filter(|ns| !ns.is_empty()),
        }
    }

    /// Loads a template as stored: the namespace's own copy first, then the global one.
    pub async fn load_raw(&self, namespace: &str, name: &str) -> Result<MonitoringDashboard> {
        match self.store.get_template(namespace, name).await {
            Ok(dashboard) => Ok(dashboard),
            Err(err) => match self.global_namespace {
                Some(global) if global != namespace => {
                    debug!(
                        "dashboard '{}' not loaded from namespace '{}' ({}), trying '{}'",
                        name, namespace, err, global
                    );
                    self.store.get_template(global, name).await
                }
                _ => Err(err),
            },
        }
    }

    /// All templates visible from `namespace`, keyed by name. Namespace entries shadow global ones.
    pub async fn load_all_raw(&self, namespace: &str) -> Result<BTreeMap<String, MonitoringDashboard>> {
        let mut all = BTreeMap::new();
        if let Some(global) = self.global_namespace {
            for dashboard in self.store.list_templates(global).await? {
                all.insert(dashboard.name().to_string(), dashboard);
            }
        }
        if self.global_namespace != Some(namespace) {
            for dashboard in self.store.list_templates(namespace).await? {
                all.insert(dashboard.name().to_string(), dashboard);
            }
        }
        Ok(all)
    }

    pub async fn resolve(&self, namespace: &str, name: &str) -> Result<ResolvedTemplate> {
        let mut loaded = Vec::new();
        let dashboard = self.load_and_resolve(namespace, name, &mut loaded).await?;
        Ok(ResolvedTemplate {
            name: dashboard.name().to_string(),
            title: dashboard.spec.title,
            runtime: dashboard.spec.runtime,
            charts: dashboard.spec.items.into_iter().map(|item| item.chart).collect(),
            external_links: dashboard.spec.external_links,
        })
    }

    /// `loaded` is the chain of templates currently being expanded.
    fn load_and_resolve<'b>(
        &'b self,
        namespace: &'b str,
        name: &'b str,
        loaded: &'b mut Vec<String>,
    ) -> BoxFuture<'b, Result<MonitoringDashboard>> {
        async move {
            if loaded.iter().any(|l| l == name) {
                return Err(DashboardError::CircularDependency {
                    reference: name.to_string(),
                    chain: loaded.clone(),
                });
            }
            loaded.push(name.to_string());
            let mut dashboard = self
                .load_raw(namespace, name)
                .await
                .map_err(|e| e.in_chain(loaded))?;

            let mut resolved = Vec::with_capacity(dashboard.spec.items.len());
            for item in std::mem::take(&mut dashboard.spec.items) {
                let reference = item
                    .include_ref()
                    .map(|r| (r.template.to_string(), r.chart.map(str::to_string)));
                let Some((template, chart)) = reference else {
                    resolved.push(item);
                    continue;
                };
                let composed = self.load_and_resolve(namespace, &template, loaded).await?;
                match chart {
                    // first chart with that name wins
                    Some(chart) => resolved.extend(
                        composed
                            .spec
                            .items
                            .into_iter()
                            .find(|candidate| candidate.chart.name == chart),
                    ),
                    None => resolved.extend(composed.spec.items),
                }
            }
            loaded.pop();

            dashboard.spec.items = resolved;
            Ok(dashboard)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::InMemoryTemplateStore;
    use crate::template::{MonitoringDashboardChart, MonitoringDashboardItem, MonitoringDashboardSpec};

    fn chart(name: &str) -> MonitoringDashboardItem {
        MonitoringDashboardItem::chart(MonitoringDashboardChart {
            name: name.to_string(),
            ..Default::default()
        })
    }

    fn dashboard(name: &str, items: Vec<MonitoringDashboardItem>) -> MonitoringDashboard {
        MonitoringDashboard::new(
            name,
            MonitoringDashboardSpec {
                title: format!("{} title", name),
                items,
                ..Default::default()
            },
        )
    }

    fn chart_names(resolved: &ResolvedTemplate) -> Vec<&str> {
        resolved.charts.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_scoped_include_takes_first_match() {
        let store = InMemoryTemplateStore::new()
            .with_template("ns", dashboard("a", vec![MonitoringDashboardItem::include("b$x")]))
            .with_template("ns", dashboard("b", vec![chart("y"), chart("x"), chart("x")]));
        let resolver = TemplateResolver::new(&store, None);

        let resolved = resolver.resolve("ns", "a").await.unwrap();
        assert_eq!(chart_names(&resolved), vec!["x"]);
        assert_eq!(resolved.title, "a title");
    }

    #[tokio::test]
    async fn test_scoped_include_without_match_adds_nothing() {
        let store = InMemoryTemplateStore::new()
            .with_template("ns", dashboard("a", vec![chart("a1"), MonitoringDashboardItem::include("b$zzz")]))
            .with_template("ns", dashboard("b", vec![chart("x")]));
        let resolved = TemplateResolver::new(&store, None).resolve("ns", "a").await.unwrap();
        assert_eq!(chart_names(&resolved), vec!["a1"]);
    }

    #[tokio::test]
    async fn test_nested_includes_flatten_in_source_order() {
        let store = InMemoryTemplateStore::new()
            .with_template(
                "ns",
                dashboard("a", vec![MonitoringDashboardItem::include("b"), chart("a1")]),
            )
            .with_template(
                "ns",
                dashboard("b", vec![chart("b1"), MonitoringDashboardItem::include("c"), chart("b2")]),
            )
            .with_template("ns", dashboard("c", vec![chart("c1")]));
        let resolved = TemplateResolver::new(&store, None).resolve("ns", "a").await.unwrap();
        assert_eq!(chart_names(&resolved), vec!["b1", "c1", "b2", "a1"]);
    }

    #[tokio::test]
    async fn test_same_template_included_twice_is_not_a_cycle() {
        let store = InMemoryTemplateStore::new()
            .with_template(
                "ns",
                dashboard(
                    "a",
                    vec![
                        MonitoringDashboardItem::include("b$x"),
                        MonitoringDashboardItem::include("b$y"),
                    ],
                ),
            )
            .with_template("ns", dashboard("b", vec![chart("x"), chart("y")]));
        let resolved = TemplateResolver::new(&store, None).resolve("ns", "a").await.unwrap();
        assert_eq!(chart_names(&resolved), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_self_include_is_circular() {
        let store = InMemoryTemplateStore::new()
            .with_template("ns", dashboard("a", vec![MonitoringDashboardItem::include("a")]));
        let err = TemplateResolver::new(&store, None).resolve("ns", "a").await.unwrap_err();
        match err {
            DashboardError::CircularDependency { reference, chain } => {
                assert_eq!(reference, "a");
                assert_eq!(chain, vec!["a"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_include_reports_chain() {
        let store = InMemoryTemplateStore::new()
            .with_template("ns", dashboard("a", vec![MonitoringDashboardItem::include("b")]))
            .with_template("ns", dashboard("b", vec![MonitoringDashboardItem::include("gone")]));
        let err = TemplateResolver::new(&store, None).resolve("ns", "a").await.unwrap_err();
        match err {
            DashboardError::NotFound { name, chain, .. } => {
                assert_eq!(name, "gone");
                assert_eq!(chain, vec!["a", "b", "gone"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_global_error_surfaces_after_fallback() {
        let store = InMemoryTemplateStore::new();
        let err = TemplateResolver::new(&store, Some("istio-system"))
            .resolve("ns", "a")
            .await
            .unwrap_err();
        match err {
            DashboardError::NotFound { namespace, .. } => assert_eq!(namespace, "istio-system"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_load_all_raw_namespace_shadows_global() {
        let store = InMemoryTemplateStore::new()
            .with_template("global", dashboard("shared", vec![chart("g")]))
            .with_template("global", dashboard("only-global", vec![]))
            .with_template("ns", dashboard("shared", vec![chart("local")]));
        let resolver = TemplateResolver::new(&store, Some("global"));

        let all = resolver.load_all_raw("ns").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["shared"].spec.items[0].chart.name, "local");

        let global_only = resolver.load_all_raw("global").await.unwrap();
        assert_eq!(global_only["shared"].spec.items[0].chart.name, "g");
    }
}
