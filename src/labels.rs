use std::collections::{BTreeMap, HashSet};

use crate::types::DEFAULT_NAMESPACE_LABEL;

pub const RUNTIMES_ANNOTATION: &str = "kiali.io/runtimes";
pub const DASHBOARDS_ANNOTATION: &str = "kiali.io/dashboards";

/// Builds a `{ns_label="ns",k="v",...}` selector. Filters come out in key order.
pub fn build_labels(
    namespace_label: &str,
    namespace: &str,
    labels_filters: &BTreeMap<String, String>,
) -> String {
    let namespace_label = if namespace_label.is_empty() {
        DEFAULT_NAMESPACE_LABEL
    } else {
        namespace_label
    };
    let mut labels = format!(r#"{{{}="{}""#, namespace_label, escape_label_value(namespace));
    for (k, v) in labels_filters {
        labels.push_str(&format!(r#",{}="{}""#, k, escape_label_value(v)));
    }
    labels.push('}');
    labels
}

/// Escapes a value for use inside a double-quoted PromQL label matcher.
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Template names referenced by workload annotations, first-seen order, no duplicates.
pub fn extract_unique_dashboards<'a, I>(annotations: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a BTreeMap<String, String>>,
{
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for annotations in annotations {
        for key in [RUNTIMES_ANNOTATION, DASHBOARDS_ANNOTATION] {
            let Some(value) = annotations.get(key) else { continue };
            for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if seen.insert(name.to_string()) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names
}

/// Parses `label=value` pairs; entries without `=` or with an empty key are skipped.
pub fn parse_label_filters<S: AsRef<str>>(pairs: &[S]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .filter_map(|pair| {
            let (k, v) = pair.as_ref().split_once('=')?;
            let k = k.trim();
            if k.is_empty() {
                return None;
            }
            Some((k.to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_labels() {
        assert_eq!(
            build_labels("namespace", "ns1", &map(&[("app", "foo")])),
            r#"{namespace="ns1",app="foo"}"#
        );
        assert_eq!(build_labels("", "ns1", &BTreeMap::new()), r#"{namespace="ns1"}"#);
        assert_eq!(
            build_labels("kubernetes_namespace", "ns1", &map(&[("version", "v1"), ("app", "foo")])),
            r#"{kubernetes_namespace="ns1",app="foo",version="v1"}"#
        );
    }

    #[test]
    fn test_build_labels_escapes_values() {
        assert_eq!(
            build_labels("namespace", "ns1", &map(&[("app", r#"fo"o"#), ("path", r"C:\tmp")])),
            r#"{namespace="ns1",app="fo\"o",path="C:\\tmp"}"#
        );
        assert_eq!(escape_label_value("a\nb"), r"a\nb");
        assert_eq!(escape_label_value("plain-value_1"), "plain-value_1");
    }

    #[test]
    fn test_extract_unique_dashboards() {
        let pods = vec![
            map(&[(RUNTIMES_ANNOTATION, "vertx-server, microprofile-1.1")]),
            map(&[(DASHBOARDS_ANNOTATION, "microprofile-1.1,,custom "), ("other", "x")]),
            map(&[]),
        ];
        assert_eq!(
            extract_unique_dashboards(&pods),
            vec!["vertx-server", "microprofile-1.1", "custom"]
        );
    }

    #[test]
    fn test_parse_label_filters() {
        let filters = parse_label_filters(&["app=reviews", "version = v2", "broken", "=x"]);
        assert_eq!(filters, map(&[("app", "reviews"), ("version", "v2")]));
    }
}
