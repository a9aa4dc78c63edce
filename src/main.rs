use anyhow::{anyhow, Context, Result};
use tracing::info;

use kube_dashboards::config::load_config;
use kube_dashboards::labels::parse_label_filters;
use kube_dashboards::{DashboardQuery, DashboardsService};

const USAGE: &str = "usage:\n  kube-dashboards dashboard <namespace> <template> [label=value...]\n  kube-dashboards discover <namespace> [label=value...]";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    info!(
        "prometheus = {}, global namespace = {:?}",
        cfg.prometheus.url, cfg.global_namespace
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let service = DashboardsService::new(cfg);

    let output = match args.first().map(String::as_str) {
        Some("dashboard") => {
            let namespace = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            let template = args.get(2).ok_or_else(|| anyhow!(USAGE))?;
            let mut query = DashboardQuery::new(namespace.as_str());
            query.labels_filters = parse_label_filters(&args[3..]);
            let dashboard = service
                .get_dashboard(&query, template)
                .await
                .with_context(|| format!("Failed to build dashboard {}", template))?;
            serde_json::to_string_pretty(&dashboard)?
        }
        Some("discover") => {
            let namespace = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            let filters = parse_label_filters(&args[2..]);
            let runtimes = service
                .discover_dashboards(namespace, &filters)
                .await
                .with_context(|| format!("Failed to discover dashboards in {}", namespace))?;
            serde_json::to_string_pretty(&runtimes)?
        }
        _ => return Err(anyhow!(USAGE)),
    };

    println!("{}", output);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
