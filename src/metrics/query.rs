//! PromQL expression builders.

pub const AVG_STAT: &str = "avg";

fn by_clause(grouping: &str) -> String {
    if grouping.is_empty() {
        String::new()
    } else {
        format!(" by ({})", grouping)
    }
}

pub fn raw_query(metric: &str, selector: &str, grouping: &str, aggregator: &str) -> String {
    if aggregator.is_empty() {
        return format!("{}{}", metric, selector);
    }
    format!("{}({}{}){}", aggregator, metric, selector, by_clause(grouping))
}

pub fn rate_query(
    metric: &str,
    selector: &str,
    grouping: &str,
    rate_func: &str,
    rate_interval: &str,
) -> String {
    format!(
        "sum({}({}{}[{}])){}",
        rate_func,
        metric,
        selector,
        rate_interval,
        by_clause(grouping)
    )
}

/// `(statistic, expression)` pairs for a histogram metric.
pub fn histogram_queries(
    metric: &str,
    selector: &str,
    grouping: &str,
    rate_interval: &str,
    quantiles: &[String],
    avg: bool,
) -> Vec<(String, String)> {
    let mut queries = Vec::with_capacity(quantiles.len() + 1);
    if avg {
        let by = by_clause(grouping);
        queries.push((
            AVG_STAT.to_string(),
            format!(
                "sum(rate({m}_sum{s}[{i}])){by} / sum(rate({m}_count{s}[{i}])){by}",
                m = metric,
                s = selector,
                i = rate_interval,
                by = by
            ),
        ));
    }
    let bucket_grouping = if grouping.is_empty() {
        "le".to_string()
    } else {
        format!("le,{}", grouping)
    };
    for quantile in quantiles {
        queries.push((
            quantile.clone(),
            format!(
                "histogram_quantile({}, sum(rate({}_bucket{}[{}])) by ({}))",
                quantile, metric, selector, rate_interval, bucket_grouping
            ),
        ));
    }
    queries
}
