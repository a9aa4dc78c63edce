use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{DashboardError, Result};
use crate::model::ExternalLink;
use crate::template::ExternalLinkSpec;
use crate::types::GrafanaConfig;

pub const GRAFANA_LINK_TYPE: &str = "grafana";

#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve_links(&self, specs: &[ExternalLinkSpec]) -> Result<Vec<ExternalLink>>;
}

/// Used when no link backend is configured.
pub struct DisabledLinks;

#[async_trait]
impl LinkResolver for DisabledLinks {
    async fn resolve_links(&self, _specs: &[ExternalLinkSpec]) -> Result<Vec<ExternalLink>> {
        Ok(Vec::new())
    }
}

pub fn link_resolver_for(config: &GrafanaConfig) -> Box<dyn LinkResolver> {
    if !config.enabled {
        return Box::new(DisabledLinks);
    }
    match GrafanaLinkResolver::new(config) {
        Ok(resolver) => Box::new(resolver),
        Err(e) => {
            error!("Grafana links disabled: {}", e);
            Box::new(DisabledLinks)
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: String,
}

pub struct GrafanaLinkResolver {
    http: reqwest::Client,
    api_url: String,
    external_url: String,
    token: Option<String>,
}

impl GrafanaLinkResolver {
    pub fn new(config: &GrafanaConfig) -> Result<Self> {
        let external_url = config
            .url
            .clone()
            .ok_or_else(|| DashboardError::BackendUnavailable("Grafana URL is not set".to_string()))?;
        let api_url = config.api_url().unwrap_or(&external_url).to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                DashboardError::BackendUnavailable(format!("cannot initialize Grafana client: {}", e))
            })?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            external_url: external_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    async fn search_dashboard(&self, name: &str) -> Result<Option<String>> {
        let mut req = self
            .http
            .get(format!("{}/api/search", self.api_url))
            .query(&[("query", name)]);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DashboardError::BackendUnavailable(format!(
                "Grafana search returned {}: {}",
                status, body
            )));
        }
        let hits: Vec<SearchHit> = res.json().await?;
        Ok(hits.into_iter().map(|hit| hit.url).find(|url| !url.is_empty()))
    }
}

#[async_trait]
impl LinkResolver for GrafanaLinkResolver {
    async fn resolve_links(&self, specs: &[ExternalLinkSpec]) -> Result<Vec<ExternalLink>> {
        let mut links = Vec::new();
        for spec in specs {
            if spec.link_type != GRAFANA_LINK_TYPE {
                debug!("skipping external link '{}' of type '{}'", spec.name, spec.link_type);
                continue;
            }
            match self.search_dashboard(&spec.name).await? {
                Some(path) => links.push(ExternalLink {
                    url: format!("{}{}", self.external_url, path),
                    name: spec.name.clone(),
                    variables: spec.variables.clone(),
                }),
                None => debug!("no Grafana dashboard named '{}'", spec.name),
            }
        }
        Ok(links)
    }
}
