//! Event and metric sinks.
//!
//! Telemetry is a fire-and-forget observer: every caller logs sink failures
//! and moves on. Running without a configured backend is a legal no-op mode
//! ([`NoopSink`]).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};

/// Default Datadog API base URL
const DATADOG_API_URL: &str = "https://api.datadoghq.com";

/// A timestamped gauge series
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metric {
    pub metric: String,
    /// `[unix_seconds, value]` pairs
    pub points: Vec<(i64, f64)>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Metric {
    pub fn gauge(name: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self {
            metric: name.into(),
            points: vec![(timestamp, value)],
            kind: "gauge",
        }
    }
}

/// Fire-and-forget telemetry sink
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Post a titled event with tags
    async fn post_event(&self, title: &str, text: &str, tags: Vec<String>) -> Result<()>;

    /// Post a batch of metric series
    async fn post_metrics(&self, metrics: Vec<Metric>) -> Result<()>;
}

/// Sink used when no telemetry backend is configured
pub struct NoopSink;

#[async_trait]
impl EventSink for NoopSink {
    async fn post_event(&self, title: &str, _text: &str, tags: Vec<String>) -> Result<()> {
        debug!(title, ?tags, "no telemetry sink configured, dropping event");
        Ok(())
    }

    async fn post_metrics(&self, metrics: Vec<Metric>) -> Result<()> {
        debug!(count = metrics.len(), "no telemetry sink configured, dropping metrics");
        Ok(())
    }
}

/// Datadog-backed sink
pub struct DatadogSink {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    app_key: Option<String>,
}

impl DatadogSink {
    pub fn new(api_key: impl Into<String>, app_key: Option<String>) -> Self {
        Self::with_base_url(DATADOG_API_URL, api_key, app_key)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        app_key: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            app_key,
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())])
            .json(&body);

        if let Some(app_key) = &self.app_key {
            request = request.query(&[("application_key", app_key.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::UnexpectedStatus {
                operation: "telemetry",
                status: response.status(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EventSink for DatadogSink {
    async fn post_event(&self, title: &str, text: &str, tags: Vec<String>) -> Result<()> {
        self.post(
            "/api/v1/events",
            json!({
                "title": title,
                "text": text,
                "tags": tags,
            }),
        )
        .await
    }

    async fn post_metrics(&self, metrics: Vec<Metric>) -> Result<()> {
        self.post("/api/v1/series", json!({ "series": metrics }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_series_payload() {
        let metric = Metric::gauge("stampede_job_pending", 1_700_000_000, 42.0);
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["metric"], "stampede_job_pending");
        assert_eq!(json["type"], "gauge");
        assert_eq!(json["points"][0][0], 1_700_000_000);
        assert_eq!(json["points"][0][1], 42.0);
    }

    #[tokio::test]
    async fn test_noop_sink_accepts_everything() {
        let sink = NoopSink;
        sink.post_event("stampede_start", "started", vec!["count:3".into()])
            .await
            .unwrap();
        sink.post_metrics(vec![Metric::gauge("x", 0, 0.0)])
            .await
            .unwrap();
    }
}
