use async_trait::async_trait;
use kube::Client;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::template::{MonitoringDashboard, MonitoringDashboardList, API_GROUP, API_VERSION, PLURAL};

/// Read access to `MonitoringDashboard` resources.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template(&self, namespace: &str, name: &str) -> Result<MonitoringDashboard>;

    async fn list_templates(&self, namespace: &str) -> Result<Vec<MonitoringDashboard>>;
}

pub struct KubeTemplateStore {
    client: Client,
}

impl KubeTemplateStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await.map_err(|e| {
            DashboardError::BackendUnavailable(format!("cannot initialize Kubernetes client: {}", e))
        })?;
        Ok(Self::new(client))
    }

    async fn get_json<T: DeserializeOwned>(&self, namespace: &str, name: Option<&str>) -> Result<T> {
        use http::Request as HttpRequest;
        let req = HttpRequest::builder()
            .method("GET")
            .uri(dashboards_path(namespace, name))
            .body(Vec::new())
            .map_err(|e| DashboardError::BackendUnavailable(format!("build request: {}", e)))?;
        match self.client.request(req).await {
            Ok(value) => Ok(value),
            Err(kube::Error::Api(resp)) if resp.code == 404 => {
                Err(DashboardError::not_found(namespace, name.unwrap_or_default()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub fn dashboards_path(namespace: &str, name: Option<&str>) -> String {
    let base = format!(
        "/apis/{}/{}/namespaces/{}/{}",
        API_GROUP, API_VERSION, namespace, PLURAL
    );
    match name {
        Some(name) => format!("{}/{}", base, name),
        None => base,
    }
}

#[async_trait]
impl TemplateStore for KubeTemplateStore {
    async fn get_template(&self, namespace: &str, name: &str) -> Result<MonitoringDashboard> {
        debug!("load k8s dashboard '{}' in namespace '{}'", name, namespace);
        self.get_json(namespace, Some(name)).await
    }

    async fn list_templates(&self, namespace: &str) -> Result<Vec<MonitoringDashboard>> {
        debug!("load all k8s dashboards in namespace '{}'", namespace);
        let list: MonitoringDashboardList = self.get_json(namespace, None).await?;
        Ok(list.items)
    }
}

/// Fixed set of templates keyed by namespace; used by tests and offline tooling.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTemplateStore {
    templates: BTreeMap<String, BTreeMap<String, MonitoringDashboard>>,
    unavailable: HashSet<String>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, namespace: impl Into<String>, template: MonitoringDashboard) -> Self {
        self.templates
            .entry(namespace.into())
            .or_default()
            .insert(template.name().to_string(), template);
        self
    }

    /// Every call against this namespace fails as if the API server were down.
    pub fn with_unavailable_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.unavailable.insert(namespace.into());
        self
    }

    fn check_available(&self, namespace: &str) -> Result<()> {
        if self.unavailable.contains(namespace) {
            return Err(DashboardError::BackendUnavailable(format!(
                "namespace '{}' unreachable",
                namespace
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get_template(&self, namespace: &str, name: &str) -> Result<MonitoringDashboard> {
        self.check_available(namespace)?;
        self.templates
            .get(namespace)
            .and_then(|templates| templates.get(name))
            .cloned()
            .ok_or_else(|| DashboardError::not_found(namespace, name))
    }

    async fn list_templates(&self, namespace: &str) -> Result<Vec<MonitoringDashboard>> {
        self.check_available(namespace)?;
        Ok(self
            .templates
            .get(namespace)
            .map(|templates| templates.values().cloned().collect())
            .unwrap_or_default())
    }
}
