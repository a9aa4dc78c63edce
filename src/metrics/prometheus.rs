use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::query::{histogram_queries, rate_query, raw_query};
use super::MetricsBackend;
use crate::error::{DashboardError, Result};
use crate::model::{Matrix, SampleStream};
use crate::types::{MetricsQuery, PrometheusConfig};

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

impl From<RawStream> for SampleStream {
    fn from(raw: RawStream) -> Self {
        SampleStream {
            metric: raw.metric,
            values: raw
                .values
                .into_iter()
                .filter_map(|(t, v)| v.parse::<f64>().ok().map(|v| (t, v)))
                .collect(),
        }
    }
}

pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(config: &PrometheusConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                DashboardError::BackendUnavailable(format!("cannot initialize Prometheus client: {}", e))
            })?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let res = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .send()
            .await?;
        let status = res.status();
        let body: ApiResponse<T> = res.json().await.map_err(|e| {
            DashboardError::BackendUnavailable(format!("prometheus returned {}: {}", status, e))
        })?;
        if body.status != "success" {
            let reason = body.error.unwrap_or_else(|| status.to_string());
            return Err(DashboardError::BackendUnavailable(format!(
                "prometheus query failed: {}",
                reason
            )));
        }
        body.data.ok_or_else(|| {
            DashboardError::BackendUnavailable("prometheus response without data".to_string())
        })
    }

    pub async fn fetch_range(&self, promql: &str, query: &MetricsQuery) -> Result<Matrix> {
        let (start, end, step) = query.range();
        debug!("prometheus range query: {}", promql);
        let params = [
            ("query", promql.to_string()),
            ("start", start.timestamp().to_string()),
            ("end", end.timestamp().to_string()),
            ("step", step.to_string()),
        ];
        let data: MatrixData = self.get("/api/v1/query_range", &params).await?;
        if data.result_type != "matrix" {
            return Err(DashboardError::BackendUnavailable(format!(
                "unexpected result type '{}' for range query",
                data.result_type
            )));
        }
        Ok(data.result.into_iter().map(SampleStream::from).collect())
    }
}

#[async_trait]
impl MetricsBackend for PrometheusClient {
    async fn query_range(
        &self,
        metric: &str,
        selector: &str,
        grouping: &str,
        aggregator: &str,
        query: &MetricsQuery,
    ) -> Result<Matrix> {
        self.fetch_range(&raw_query(metric, selector, grouping, aggregator), query)
            .await
    }

    async fn query_rate_range(
        &self,
        metric: &str,
        selector: &str,
        grouping: &str,
        query: &MetricsQuery,
    ) -> Result<Matrix> {
        let promql = rate_query(metric, selector, grouping, &query.rate_func, &query.rate_interval);
        self.fetch_range(&promql, query).await
    }

    async fn query_histogram_range(
        &self,
        metric: &str,
        selector: &str,
        grouping: &str,
        query: &MetricsQuery,
    ) -> Result<BTreeMap<String, Matrix>> {
        let queries = histogram_queries(
            metric,
            selector,
            grouping,
            &query.rate_interval,
            &query.quantiles,
            query.avg,
        );
        // every statistic must cover the same window
        let pinned = query.pinned();
        let results = join_all(queries.iter().map(|(_, promql)| self.fetch_range(promql, &pinned))).await;
        let mut histogram = BTreeMap::new();
        for ((stat, _), result) in queries.into_iter().zip(results) {
            histogram.insert(stat, result?);
        }
        Ok(histogram)
    }

    async fn list_metric_names(&self, selectors: &[String]) -> Result<Vec<String>> {
        let params: Vec<(&str, String)> = selectors.iter().map(|s| ("match[]", s.clone())).collect();
        self.get("/api/v1/label/__name__/values", &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;

    fn client(url: String) -> PrometheusClient {
        PrometheusClient::new(&PrometheusConfig { url, timeout_seconds: 5 }).unwrap()
    }

    fn fixed_query() -> MetricsQuery {
        MetricsQuery {
            start: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            end: Some(Utc.timestamp_opt(1_700_001_800, 0).unwrap()),
            step_seconds: Some(30),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_query_range_parses_matrix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query_range")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), r#"sum(jvm_threads{namespace="ns1"}) by (app)"#.into()),
                Matcher::UrlEncoded("start".into(), "1700000000".into()),
                Matcher::UrlEncoded("end".into(), "1700001800".into()),
                Matcher::UrlEncoded("step".into(), "30".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"success","data":{"resultType":"matrix","result":[
                    {"metric":{"app":"reviews"},"values":[[1700000000,"12"],[1700000030,"NaN"],[1700000060,"bad"]]}
                ]}}"#,
            )
            .create_async()
            .await;

        let matrix = client(server.url())
            .query_range("jvm_threads", r#"{namespace="ns1"}"#, "app", "sum", &fixed_query())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix[0].metric["app"], "reviews");
        assert_eq!(matrix[0].values.len(), 2);
        assert_eq!(matrix[0].values[0], (1_700_000_000.0, 12.0));
        assert!(matrix[0].values[1].1.is_nan());
    }

    #[tokio::test]
    async fn test_query_error_maps_to_backend_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/query_range")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"error","errorType":"bad_data","error":"parse error at char 4"}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .query_rate_range("m", "{}", "", &fixed_query())
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::BackendUnavailable(_)));
        assert!(err.to_string().contains("parse error"));
    }

    #[tokio::test]
    async fn test_histogram_range_one_matrix_per_stat() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query_range")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{},"values":[[1,"0.5"]]}]}}"#)
            .expect(3)
            .create_async()
            .await;

        let query = MetricsQuery {
            quantiles: vec!["0.5".to_string(), "0.99".to_string()],
            ..fixed_query()
        };
        let histo = client(server.url())
            .query_histogram_range("latency", "{}", "", &query)
            .await
            .unwrap();
        mock.assert_async().await;
        let stats: Vec<_> = histo.keys().cloned().collect();
        assert_eq!(stats, vec!["0.5", "0.99", "avg"]);
    }

    #[tokio::test]
    async fn test_histogram_stats_share_unpinned_window() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query_range")
            .match_query(Matcher::UrlEncoded("step".into(), "15".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#)
            .expect(2)
            .create_async()
            .await;

        let query = MetricsQuery {
            quantiles: vec!["0.95".to_string()],
            ..Default::default()
        };
        assert!(query.end.is_none());
        let histo = client(server.url())
            .query_histogram_range("latency", "{}", "", &query)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(histo.len(), 2);
    }

    #[tokio::test]
    async fn test_list_metric_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/label/__name__/values")
            .match_query(Matcher::UrlEncoded("match[]".into(), r#"{namespace="ns1"}"#.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","data":["jvm_threads","vertx_pool_ratio"]}"#)
            .create_async()
            .await;

        let names = client(server.url())
            .list_metric_names(&[r#"{namespace="ns1"}"#.to_string()])
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(names, vec!["jvm_threads", "vertx_pool_ratio"]);
    }
}
