use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use crate::types::{Config, GrafanaConfig, PrometheusConfig, DEFAULT_NAMESPACE_LABEL};

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

/// Unset and blank values are treated alike.
fn non_empty<E: EnvironmentProvider>(env: &E, key: &str) -> Option<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let global_namespace = non_empty(env, "GLOBAL_NAMESPACE");

    let namespace_label = non_empty(env, "NAMESPACE_LABEL")
        .unwrap_or_else(|| DEFAULT_NAMESPACE_LABEL.to_string());

    let defaults = PrometheusConfig::default();
    let prometheus_url = non_empty(env, "PROMETHEUS_URL").unwrap_or(defaults.url);
    let timeout_seconds: u64 = match non_empty(env, "PROMETHEUS_TIMEOUT_SECONDS") {
        Some(v) => v.parse().context("Invalid PROMETHEUS_TIMEOUT_SECONDS")?,
        None => defaults.timeout_seconds,
    };

    let grafana_enabled = env
        .get_var("GRAFANA_ENABLED")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);
    let grafana_url = non_empty(env, "GRAFANA_URL");
    let grafana_timeout_seconds: u64 = match non_empty(env, "GRAFANA_TIMEOUT_SECONDS") {
        Some(v) => v.parse().context("Invalid GRAFANA_TIMEOUT_SECONDS")?,
        None => GrafanaConfig::default().timeout_seconds,
    };
    if grafana_enabled && grafana_url.is_none() {
        return Err(anyhow!("GRAFANA_URL must be set when GRAFANA_ENABLED is true"));
    }

    Ok(Config {
        global_namespace,
        namespace_label,
        prometheus: PrometheusConfig {
            url: prometheus_url,
            timeout_seconds,
        },
        grafana: GrafanaConfig {
            enabled: grafana_enabled,
            url: grafana_url,
            in_cluster_url: non_empty(env, "GRAFANA_IN_CLUSTER_URL"),
            token: non_empty(env, "GRAFANA_TOKEN"),
            timeout_seconds: grafana_timeout_seconds,
        },
    })
}
