// Public modules
pub mod types;
pub mod config;
pub mod error;
pub mod template;
pub mod labels;
pub mod kubernetes;
pub mod metrics;
pub mod links;
pub mod model;
pub mod resolver;
pub mod aggregator;
pub mod discovery;
pub mod service;

// Re-export commonly used items
pub use types::*;
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use error::DashboardError;
pub use template::{
    DataType, MonitoringDashboard, MonitoringDashboardChart, MonitoringDashboardItem,
    MonitoringDashboardSpec, ResolvedTemplate,
};
pub use labels::{build_labels, extract_unique_dashboards};
pub use kubernetes::{InMemoryTemplateStore, KubeTemplateStore, TemplateStore};
pub use metrics::{MetricsBackend, PrometheusClient};
pub use links::{DisabledLinks, GrafanaLinkResolver, LinkResolver};
pub use model::{Chart, FilledDashboard, Runtime, DashboardRef, Series};
pub use resolver::TemplateResolver;
pub use aggregator::MetricsAggregator;
pub use discovery::run_discovery_matcher;
pub use service::DashboardsService;
