use k8s_openapi::api::core::v1::Pod;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::aggregator::MetricsAggregator;
use crate::discovery::{build_runtimes_list, discover};
use crate::error::{DashboardError, Result};
use crate::kubernetes::{KubeTemplateStore, TemplateStore};
use crate::labels::{build_labels, extract_unique_dashboards};
use crate::links::{link_resolver_for, LinkResolver};
use crate::metrics::{MetricsBackend, PrometheusClient};
use crate::model::{FilledDashboard, Runtime};
use crate::resolver::TemplateResolver;
use crate::types::{Config, DashboardQuery};

/// Entry point for dashboard requests. Clients are built on first use and reused afterwards.
pub struct DashboardsService {
    config: Config,
    store: OnceCell<Arc<dyn TemplateStore>>,
    backend: OnceCell<Arc<dyn MetricsBackend>>,
    links: OnceCell<Arc<dyn LinkResolver>>,
}

impl DashboardsService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: OnceCell::new(),
            backend: OnceCell::new(),
            links: OnceCell::new(),
        }
    }

    /// Service over already-built clients.
    pub fn with_clients(
        config: Config,
        store: Arc<dyn TemplateStore>,
        backend: Arc<dyn MetricsBackend>,
    ) -> Self {
        Self {
            config,
            store: OnceCell::new_with(Some(store)),
            backend: OnceCell::new_with(Some(backend)),
            links: OnceCell::new(),
        }
    }

    pub fn with_link_resolver(mut self, links: Arc<dyn LinkResolver>) -> Self {
        self.links = OnceCell::new_with(Some(links));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn k8s(&self) -> Result<&Arc<dyn TemplateStore>> {
        self.store
            .get_or_try_init(|| async {
                debug!("initializing Kubernetes client");
                let store = KubeTemplateStore::try_default().await?;
                Ok::<_, DashboardError>(Arc::new(store) as Arc<dyn TemplateStore>)
            })
            .await
    }

    async fn prom(&self) -> Result<&Arc<dyn MetricsBackend>> {
        self.backend
            .get_or_try_init(|| async {
                debug!("initializing Prometheus client for {}", self.config.prometheus.url);
                let client = PrometheusClient::new(&self.config.prometheus)?;
                Ok::<_, DashboardError>(Arc::new(client) as Arc<dyn MetricsBackend>)
            })
            .await
    }

    async fn link_resolver(&self) -> &Arc<dyn LinkResolver> {
        self.links
            .get_or_init(|| async { Arc::from(link_resolver_for(&self.config.grafana)) })
            .await
    }

    fn resolver<'a>(&'a self, store: &'a Arc<dyn TemplateStore>) -> TemplateResolver<'a> {
        TemplateResolver::new(store.as_ref(), self.config.global_namespace.as_deref())
    }

    /// Resolves `template` and fills every chart with data for the queried workload.
    pub async fn get_dashboard(&self, query: &DashboardQuery, template: &str) -> Result<FilledDashboard> {
        let backend = self.prom().await?;
        let store = self.k8s().await?;
        let resolved = self.resolver(store).resolve(&query.namespace, template).await?;

        // pin the time window once so every chart covers the same range
        let mut query = query.clone();
        query.fill_defaults();

        let links = self.link_resolver().await;
        let aggregator = MetricsAggregator::new(
            backend.as_ref(),
            links.as_ref(),
            &self.config.namespace_label,
        );
        let dashboard = aggregator.fill(&resolved, &query).await;
        info!(
            "dashboard '{}' filled for namespace {} ({} charts)",
            template,
            query.namespace,
            dashboard.charts.len()
        );
        Ok(dashboard)
    }

    /// Dashboards named by the `kiali.io/runtimes` and `kiali.io/dashboards` pod annotations.
    pub async fn search_explicit_dashboards(&self, namespace: &str, pods: &[Pod]) -> Vec<Runtime> {
        let templates =
            extract_unique_dashboards(pods.iter().filter_map(|p| p.metadata.annotations.as_ref()));
        if templates.is_empty() {
            return Vec::new();
        }
        debug!("getting dashboards from refs list: {:?}", templates);
        let store = match self.k8s().await {
            Ok(store) => store,
            Err(e) => {
                error!("cannot search explicit dashboards in namespace {}: {}", namespace, e);
                return Vec::new();
            }
        };
        build_runtimes_list(&self.resolver(store), namespace, &templates).await
    }

    /// Infers dashboards from the metric names reported under `labels_filters`.
    pub async fn discover_dashboards(
        &self,
        namespace: &str,
        labels_filters: &BTreeMap<String, String>,
    ) -> Result<Vec<Runtime>> {
        debug!(
            "starting runtimes discovery on namespace {} with filters {:?}",
            namespace, labels_filters
        );
        let store = self.k8s().await?;
        discover(
            &self.resolver(store),
            namespace,
            self.fetch_metric_names(namespace, labels_filters),
        )
        .await
    }

    async fn fetch_metric_names(
        &self,
        namespace: &str,
        labels_filters: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let backend = match self.prom().await {
            Ok(backend) => backend,
            Err(e) => {
                error!("runtimes discovery: metrics backend unavailable: {}", e);
                return Vec::new();
            }
        };
        let labels = build_labels(&self.config.namespace_label, namespace, labels_filters);
        match backend.list_metric_names(std::slice::from_ref(&labels)).await {
            Ok(metrics) => metrics,
            Err(e) => {
                error!(
                    "runtimes discovery failed, cannot load metrics for labels {}: {}",
                    labels, e
                );
                Vec::new()
            }
        }
    }
}
